//! Orchestrates one master and a dynamic set of tablet servers inside the
//! test process.
//!
//! ## Lifecycle
//! - [`MiniCluster::start`]: allocates `<root>/master`, starts the master, then
//!   allocates `<root>/ts-<i>` and starts each initial tablet server. Every
//!   start only initiates the service.
//! - [`MiniCluster::start_sync`]: `start` plus waiting until the master serves
//!   and every initial tablet server has registered.
//! - [`MiniCluster::add_tablet_server`]: appends one more tablet server on an
//!   ephemeral port while running.
//! - [`MiniCluster::shutdown`]: stops tablet servers first, then the master.
//!   Idempotent, and run on `Drop`.
//!
//! A failed `start` does not roll back: services already started keep
//! running until `shutdown`.
//!
//! ## Ownership
//! The master is owned exclusively. Tablet servers are `Arc`s; callers may
//! keep clones past `shutdown`, but the underlying service is stopped anyway.
//!
//! Lifecycle methods take `&mut self`, so one owner drives the cluster.

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::LoopbackFactory;
use super::ServerFactory;
use crate::utils::file_io::DefaultEnv;
use crate::utils::file_io::Env;
use crate::ClusterConfig;
use crate::Error;
use crate::MasterHandle;
use crate::Result;
use crate::TabletServerHandle;

/// Subdirectory of the cluster root holding the master's state.
pub const MASTER_DIR: &str = "master";

/// Subdirectory prefix of the cluster root for tablet server `i`: `ts-<i>`.
pub const TSERVER_DIR_PREFIX: &str = "ts-";

pub struct MiniCluster<F: ServerFactory = LoopbackFactory> {
    running: bool,
    env: Arc<dyn Env>,
    factory: F,
    fs_root: PathBuf,
    pub(super) config: ClusterConfig,

    pub(super) master: Option<Box<F::Master>>,
    tablet_servers: Vec<Arc<F::TabletServer>>,
}

impl MiniCluster<LoopbackFactory> {
    /// Cluster of bundled loopback services with roots under the OS temp dir.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if `config` fails validation
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let factory = LoopbackFactory::new(config.tablet_server);
        Self::with_factory(config, Arc::new(DefaultEnv::default()), factory)
    }
}

impl<F: ServerFactory> MiniCluster<F> {
    /// # Errors
    /// Returns `Error::InvalidArgument` if `config` fails validation
    pub fn with_factory(
        config: ClusterConfig,
        env: Arc<dyn Env>,
        factory: F,
    ) -> Result<Self> {
        config.validate()?;

        let fs_root = if config.data_root.as_os_str().is_empty() {
            env.unique_cluster_root()
        } else {
            config.data_root.clone()
        };
        debug!("cluster root resolved to {}", fs_root.display());

        Ok(Self {
            running: false,
            env,
            factory,
            fs_root,
            config,
            master: None,
            tablet_servers: Vec::new(),
        })
    }

    /// Starts the master and `num_tablet_servers` tablet servers.
    ///
    /// Returns once every component has initiated startup.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if components from a previous `start` are
    ///   still present (call `shutdown` first)
    /// - `Error::Io` if a root directory cannot be allocated
    /// - `Error::StartupFailure` if a component fails to initiate; components
    ///   started before it stay running
    pub async fn start(&mut self) -> Result<()> {
        if self.running || self.master.is_some() {
            return Err(Error::InvalidArgument(
                "cluster is already started; call shutdown() first".into(),
            ));
        }

        self.env.create_dir_all(&self.fs_root)?;

        let master_root = self.master_fs_root();
        self.env.create_dir_all(&master_root)?;
        let master = Box::new(self.factory.new_master(master_root, self.config.master_rpc_port)?);
        let started = master.start().await;
        // Kept even on failure so shutdown() can release it
        self.master = Some(master);
        started?;

        let master_addr = self.master_addr()?;
        info!("master started on {}", master_addr);

        for idx in 0..self.config.initial_tablet_servers() {
            self.start_tablet_server(idx, self.config.tserver_port(idx), master_addr)
                .await?;
        }

        self.running = true;
        info!(
            "cluster at {} started with {} tablet servers",
            self.fs_root.display(),
            self.tablet_servers.len()
        );
        Ok(())
    }

    /// Like [`MiniCluster::start`], then blocks until the master serves and
    /// every initial tablet server has registered with it.
    ///
    /// # Errors
    /// Same as `start`, plus `Error::TimedOut` if the cluster does not
    /// converge within the configured deadlines.
    pub async fn start_sync(&mut self) -> Result<()> {
        self.start().await?;

        let master = self.running_master()?;
        master
            .wait_until_serving(self.config.wait.master_startup_timeout())
            .await?;

        self.wait_for_tablet_server_count(self.config.initial_tablet_servers())
            .await
    }

    /// Adds and starts a new tablet server on an ephemeral port. Registration
    /// happens asynchronously; follow with `wait_for_tablet_server_count` for a
    /// synchronized view.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the cluster is not running
    /// - `Error::Io` / `Error::StartupFailure` as for `start`
    pub async fn add_tablet_server(&mut self) -> Result<()> {
        if !self.running {
            return Err(Error::InvalidArgument(
                "cannot add a tablet server: cluster is not running".into(),
            ));
        }

        let master_addr = self.master_addr()?;
        let idx = self.tablet_servers.len();
        self.start_tablet_server(idx, 0, master_addr).await
    }

    /// Stops all tablet servers, then the master, and releases the cluster's
    /// references to them. Safe to call at any time, any number of times.
    pub fn shutdown(&mut self) {
        let num_tablet_servers = self.tablet_servers.len();
        for ts in self.tablet_servers.drain(..) {
            ts.shutdown();
        }

        if let Some(master) = self.master.take() {
            master.shutdown();
        }

        if self.running {
            info!(
                "cluster at {} shut down ({} tablet servers)",
                self.fs_root.display(),
                num_tablet_servers
            );
        }
        self.running = false;
    }

    async fn start_tablet_server(
        &mut self,
        idx: usize,
        rpc_port: u16,
        master_addr: SocketAddr,
    ) -> Result<()> {
        let root = self.tablet_server_root(idx);
        self.env.create_dir_all(&root)?;

        let ts = Arc::new(self.factory.new_tablet_server(root, rpc_port, master_addr)?);
        if let Err(e) = ts.start().await {
            ts.shutdown();
            return Err(e);
        }

        debug!("tablet server #{idx} started (requested port {rpc_port})");
        self.tablet_servers.push(ts);
        Ok(())
    }

    fn master_addr(&self) -> Result<SocketAddr> {
        let master = self
            .master
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("master is not running".into()))?;
        master
            .bound_addr()
            .ok_or_else(|| Error::startup("master", "started without a bound address"))
    }

    /// The master, if it is present and running.
    pub(super) fn running_master(&self) -> Result<&F::Master> {
        self.master
            .as_deref()
            .filter(|m| m.is_running())
            .ok_or_else(|| Error::InvalidArgument("master is not running".into()))
    }

    fn tablet_server_root(
        &self,
        idx: usize,
    ) -> PathBuf {
        self.fs_root.join(format!("{TSERVER_DIR_PREFIX}{idx}"))
    }

    fn check_tablet_server_index(
        &self,
        idx: usize,
    ) {
        assert!(
            idx < self.tablet_servers.len(),
            "tablet server index {idx} out of range [0, {})",
            self.tablet_servers.len()
        );
    }

    //-----------------------------------------------------------
    // Accessors

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// The master, present from `start` until `shutdown`.
    pub fn master(&self) -> Option<&F::Master> {
        self.master.as_deref()
    }

    /// The tablet server added at position `idx`.
    ///
    /// # Panics
    /// If `idx` is not in `[0, num_tablet_servers())`.
    pub fn tablet_server(
        &self,
        idx: usize,
    ) -> &Arc<F::TabletServer> {
        self.check_tablet_server_index(idx);
        &self.tablet_servers[idx]
    }

    pub fn tablet_servers(&self) -> &[Arc<F::TabletServer>] {
        &self.tablet_servers
    }

    pub fn num_tablet_servers(&self) -> usize {
        self.tablet_servers.len()
    }

    /// Looks a tablet server up by the uuid it registered with.
    pub fn find_tablet_server(
        &self,
        uuid: &str,
    ) -> Option<Arc<F::TabletServer>> {
        self.tablet_servers
            .iter()
            .find(|ts| ts.uuid().as_deref() == Some(uuid))
            .cloned()
    }

    pub fn fs_root(&self) -> &Path {
        &self.fs_root
    }

    pub fn master_fs_root(&self) -> PathBuf {
        self.fs_root.join(MASTER_DIR)
    }

    /// # Panics
    /// If `idx` is not in `[0, num_tablet_servers())`.
    pub fn tablet_server_fs_root(
        &self,
        idx: usize,
    ) -> PathBuf {
        self.check_tablet_server_index(idx);
        self.tablet_server_root(idx)
    }
}

impl<F: ServerFactory> Drop for MiniCluster<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
