//! Worker side of the cluster.
//!
//! Handles are shared (`Arc`) between the cluster and any test code that
//! keeps a reference, so every method takes `&self`. Once `shutdown` runs the
//! service stops regardless of how many references remain.

mod heartbeater;
mod meta_store;
mod mini_tablet_server;
pub use mini_tablet_server::*;


use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TabletServerHandle: Send + Sync + 'static {
    /// Binds the RPC endpoint and begins heartbeating to the master.
    /// Returns once startup has been initiated; registration with the master
    /// happens asynchronously.
    async fn start(&self) -> Result<()>;

    /// Blocks until the master acknowledged this server's first heartbeat.
    async fn wait_registered(
        &self,
        timeout: Duration,
    ) -> Result<()>;

    /// Stops serving and heartbeating. Idempotent; never fails.
    fn shutdown(&self);

    fn is_running(&self) -> bool;

    fn bound_addr(&self) -> Option<SocketAddr>;

    /// Persistent identity, known once the server has been started.
    fn uuid(&self) -> Option<String>;
}
