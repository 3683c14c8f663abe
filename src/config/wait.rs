use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Deadlines for the convergence-wait primitives.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Upper bound for `wait_for_tablet_server_count` (unit: milliseconds)
    #[serde(default = "default_registration_wait_timeout_ms")]
    pub registration_wait_timeout_ms: u64,

    /// Upper bound for `wait_for_replica_count` (unit: milliseconds)
    #[serde(default = "default_tablet_report_wait_timeout_ms")]
    pub tablet_report_wait_timeout_ms: u64,

    /// Upper bound for the master to start serving in `start_sync`
    /// (unit: milliseconds)
    #[serde(default = "default_master_startup_timeout_ms")]
    pub master_startup_timeout_ms: u64,

    /// Sleep between two queries of the master (unit: milliseconds).
    /// Not part of any timing guarantee.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            registration_wait_timeout_ms: default_registration_wait_timeout_ms(),
            tablet_report_wait_timeout_ms: default_tablet_report_wait_timeout_ms(),
            master_startup_timeout_ms: default_master_startup_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WaitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidArgument(
                "wait.poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_wait_timeout_ms)
    }

    pub fn tablet_report_timeout(&self) -> Duration {
        Duration::from_millis(self.tablet_report_wait_timeout_ms)
    }

    pub fn master_startup_timeout(&self) -> Duration {
        Duration::from_millis(self.master_startup_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_registration_wait_timeout_ms() -> u64 {
    5000
}
fn default_tablet_report_wait_timeout_ms() -> u64 {
    5000
}
fn default_master_startup_timeout_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    10
}
