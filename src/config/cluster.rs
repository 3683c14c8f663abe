use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::TabletServerOptions;
use super::WaitConfig;
use crate::Error;
use crate::Result;

/// Sizing and port parameters of a [`crate::MiniCluster`], fixed at construction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Number of tablet servers started by `start`. Zero yields a master-only
    /// cluster; negative values are rejected by [`ClusterConfig::validate`].
    #[serde(default = "default_num_tablet_servers")]
    pub num_tablet_servers: i32,

    /// Directory in which to store data. Empty auto-generates a unique path
    /// for this cluster.
    #[serde(default)]
    pub data_root: PathBuf,

    /// RPC port for the master. 0 requests an ephemeral port.
    #[serde(default)]
    pub master_rpc_port: u16,

    /// RPC ports for the initial tablet servers, by index. Indices beyond the
    /// end of the list bind ephemeral ports.
    #[serde(default)]
    pub tserver_rpc_ports: Vec<u16>,

    #[serde(default)]
    pub wait: WaitConfig,

    #[serde(default)]
    pub tablet_server: TabletServerOptions,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_tablet_servers: default_num_tablet_servers(),
            data_root: PathBuf::new(),
            master_rpc_port: 0,
            tserver_rpc_ports: vec![],
            wait: WaitConfig::default(),
            tablet_server: TabletServerOptions::default(),
        }
    }
}

impl ClusterConfig {
    /// Validates sizing parameters.
    /// # Errors
    /// Returns `Error::InvalidArgument` if any rule is violated
    pub fn validate(&self) -> Result<()> {
        if self.num_tablet_servers < 0 {
            return Err(Error::InvalidArgument(format!(
                "num_tablet_servers must be >= 0, got {}",
                self.num_tablet_servers
            )));
        }

        self.wait.validate()?;
        self.tablet_server.validate()?;

        Ok(())
    }

    /// Number of tablet servers to start initially. Only meaningful after
    /// a successful [`ClusterConfig::validate`].
    pub fn initial_tablet_servers(&self) -> usize {
        self.num_tablet_servers.max(0) as usize
    }

    /// Port for the tablet server at `idx`: the configured value, or 0 when
    /// the port list is shorter than `idx + 1`.
    pub fn tserver_port(
        &self,
        idx: usize,
    ) -> u16 {
        self.tserver_rpc_ports.get(idx).copied().unwrap_or(0)
    }
}

fn default_num_tablet_servers() -> i32 {
    1
}
