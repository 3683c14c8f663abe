//! Coordinator side of the cluster.
//!
//! [`MasterHandle`] is the only surface [`crate::MiniCluster`] relies on:
//! lifecycle plus the two read-only views (membership and replica placement)
//! that the convergence waits poll. [`MiniMaster`] is the bundled loopback
//! implementation.

mod mini_master;
mod registry;
pub use mini_master::*;
pub(crate) use registry::*;


use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Master-side view of one registered tablet server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsDescriptor {
    pub uuid: String,
    pub rpc_addr: SocketAddr,
    /// Position in registration order, starting at 0
    pub registration_seq: u64,
    pub registered_at_ms: u64,
    pub last_heartbeat_ms: u64,
    pub last_heartbeat_seq: u64,
    /// Tablets hosted according to the latest report, sorted
    pub tablets: Vec<String>,
}

/// One reported replica of a tablet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaLocation {
    pub tablet_id: String,
    pub ts_uuid: String,
    pub rpc_addr: SocketAddr,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MasterHandle: Send + Sync + 'static {
    /// Binds the RPC endpoint and initiates serving. Returns once startup
    /// has been initiated, not necessarily once the master is serving.
    ///
    /// # Errors
    /// - `Error::StartupFailure` if the instance cannot be brought up
    /// - `Error::InvalidArgument` if already running
    async fn start(&self) -> Result<()>;

    /// Blocks until the master answers requests, or `timeout` elapses.
    async fn wait_until_serving(
        &self,
        timeout: Duration,
    ) -> Result<()>;

    /// Stops serving. Idempotent; never fails.
    fn shutdown(&self);

    fn is_running(&self) -> bool;

    /// Address the master is bound to while running.
    fn bound_addr(&self) -> Option<SocketAddr>;

    /// Tablet servers that completed registration, in registration order.
    async fn list_registered_tablet_servers(&self) -> Result<Vec<TsDescriptor>>;

    /// Replicas of `tablet_id` as reported by registered tablet servers.
    async fn list_replica_locations(
        &self,
        tablet_id: &str,
    ) -> Result<Vec<ReplicaLocation>>;
}
