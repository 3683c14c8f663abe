//! Configuration management for the in-process cluster harness.
//!
//! Settings are assembled from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML file
//! 3. Environment variables prefixed with `MINICLUSTER__` (highest priority)
//!
//! Tests usually build a [`ClusterConfig`] directly with struct update syntax;
//! the layered loader exists so long-running suites can stretch wait windows
//! from the environment without code changes.

mod cluster;
mod tablet_server;
mod wait;
pub use cluster::*;
pub use tablet_server::*;
pub use wait::*;


//---
use config::Config;
use config::Environment;
use config::File;

use crate::Result;

/// Environment variable prefix, e.g. `MINICLUSTER__NUM_TABLET_SERVERS=3` or
/// `MINICLUSTER__WAIT__REGISTRATION_WAIT_TIMEOUT_MS=20000`.
pub const ENV_PREFIX: &str = "MINICLUSTER";

/// Parsed as a comma separated list from the environment, e.g.
/// `MINICLUSTER__TSERVER_RPC_PORTS=7050,7051`.
const TSERVER_RPC_PORTS_KEY: &str = "tserver_rpc_ports";

impl ClusterConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML file overriding the defaults
    ///
    /// # Errors
    /// Returns [`crate::Error::Config`] if a source cannot be read or parsed,
    /// and [`crate::Error::InvalidArgument`] if the merged values fail
    /// [`ClusterConfig::validate`].
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(p) = path {
            builder = builder.add_source(File::with_name(p).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key(TSERVER_RPC_PORTS_KEY),
        );

        let config: ClusterConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
