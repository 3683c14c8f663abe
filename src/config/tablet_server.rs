use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Knobs of the bundled loopback tablet server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TabletServerOptions {
    /// Interval between two heartbeats to the master (unit: milliseconds)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Connect timeout towards the master (unit: milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for TabletServerOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl TabletServerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::InvalidArgument(
                "tablet_server.heartbeat_interval_ms must be greater than 0".into(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::InvalidArgument(
                "tablet_server.connect_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    50
}
fn default_connect_timeout_ms() -> u64 {
    500
}
