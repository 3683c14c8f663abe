use std::net::SocketAddr;
use std::path::PathBuf;

use crate::MasterHandle;
use crate::MiniMaster;
use crate::MiniTabletServer;
use crate::Result;
use crate::TabletServerHandle;
use crate::TabletServerOptions;

/// Creates the services a [`crate::MiniCluster`] orchestrates. Creation must
/// not start anything; the cluster calls `start` itself.
pub trait ServerFactory: Send + Sync + 'static {
    type Master: MasterHandle;
    type TabletServer: TabletServerHandle;

    fn new_master(
        &self,
        fs_root: PathBuf,
        rpc_port: u16,
    ) -> Result<Self::Master>;

    fn new_tablet_server(
        &self,
        fs_root: PathBuf,
        rpc_port: u16,
        master_addr: SocketAddr,
    ) -> Result<Self::TabletServer>;
}

/// Builds the bundled [`MiniMaster`] and [`MiniTabletServer`].
#[derive(Debug, Clone, Default)]
pub struct LoopbackFactory {
    tablet_server: TabletServerOptions,
}

impl LoopbackFactory {
    pub fn new(tablet_server: TabletServerOptions) -> Self {
        Self { tablet_server }
    }
}

impl ServerFactory for LoopbackFactory {
    type Master = MiniMaster;
    type TabletServer = MiniTabletServer;

    fn new_master(
        &self,
        fs_root: PathBuf,
        rpc_port: u16,
    ) -> Result<MiniMaster> {
        Ok(MiniMaster::new(fs_root, rpc_port))
    }

    fn new_tablet_server(
        &self,
        fs_root: PathBuf,
        rpc_port: u16,
        master_addr: SocketAddr,
    ) -> Result<MiniTabletServer> {
        Ok(MiniTabletServer::new(fs_root, rpc_port, master_addr, self.tablet_server))
    }
}
