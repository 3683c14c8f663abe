//! In-process master/tablet-server cluster for integration tests.
//!
//! A [`MiniCluster`] starts one master and a configurable number of tablet
//! servers inside the test process, all bound to loopback, and offers
//! bounded polling waits for cluster-wide state that only converges through
//! asynchronous heartbeats.
//!
//! ```rust,no_run
//! # async fn demo() -> tablet_minicluster::Result<()> {
//! use tablet_minicluster::{ClusterConfig, MiniCluster};
//!
//! let mut cluster = MiniCluster::new(ClusterConfig {
//!     num_tablet_servers: 3,
//!     ..Default::default()
//! })?;
//! cluster.start_sync().await?;
//! cluster.tablet_server(0).create_tablet("tablet-1")?;
//! cluster.wait_for_replica_count("tablet-1", 1).await?;
//! cluster.shutdown();
//! # Ok(())
//! # }
//! ```

mod cluster;
mod config;
mod errors;
mod master;
pub mod metrics;
pub mod network;
mod tserver;
pub mod utils;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use master::*;
pub use tserver::*;
pub use utils::file_io::DefaultEnv;
pub use utils::file_io::Env;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
