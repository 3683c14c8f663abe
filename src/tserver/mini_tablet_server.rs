//! In-process tablet server bound to the loopback interface.
//!
//! Identity and hosted tablets are persisted in a `sled` store under
//! `<fs_root>/meta`, so a restarted server reports under the same uuid.
//! Tablets are plain ids here: hosting one only means it is included in
//! every heartbeat, which is what the master derives replica placement from.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::heartbeater::Heartbeater;
use super::meta_store::TabletMetaStore;
use super::TabletServerHandle;
use crate::network::serve_requests;
use crate::network::TabletServerRequest;
use crate::network::TabletServerResponse;
use crate::utils::net::loopback_addr;
use crate::Error;
use crate::Result;
use crate::TabletServerOptions;

/// Directory under the tablet-server root holding the metadata store.
pub const TSERVER_META_DIR: &str = "meta";

pub struct MiniTabletServer {
    fs_root: PathBuf,
    rpc_port: u16,
    master_addr: SocketAddr,
    options: TabletServerOptions,
    tablets: Arc<RwLock<BTreeSet<String>>>,
    uuid: Mutex<Option<String>>,
    state: Mutex<Option<RunningTabletServer>>,
}

struct RunningTabletServer {
    addr: SocketAddr,
    meta: TabletMetaStore,
    shutdown_tx: watch::Sender<()>,
    registered_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl MiniTabletServer {
    /// `rpc_port` 0 binds an ephemeral port.
    pub fn new(
        fs_root: impl Into<PathBuf>,
        rpc_port: u16,
        master_addr: SocketAddr,
        options: TabletServerOptions,
    ) -> Self {
        Self {
            fs_root: fs_root.into(),
            rpc_port,
            master_addr,
            options,
            tablets: Arc::new(RwLock::new(BTreeSet::new())),
            uuid: Mutex::new(None),
            state: Mutex::new(None),
        }
    }

    pub fn fs_root(&self) -> &Path {
        &self.fs_root
    }

    pub fn master_addr(&self) -> SocketAddr {
        self.master_addr
    }

    /// Starts hosting a replica of `tablet_id`. The master learns about it
    /// with the next heartbeat. Returns false if it was already hosted.
    pub fn create_tablet(
        &self,
        tablet_id: &str,
    ) -> Result<bool> {
        let state = self.state.lock();
        let running = state
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("tablet server is not running".into()))?;
        let created = running.meta.add_tablet(tablet_id)?;
        self.tablets.write().insert(tablet_id.to_string());
        debug!("hosting tablet {tablet_id} (new: {created})");
        Ok(created)
    }

    /// Stops hosting `tablet_id`. Returns false if it was not hosted.
    pub fn delete_tablet(
        &self,
        tablet_id: &str,
    ) -> Result<bool> {
        let state = self.state.lock();
        let running = state
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("tablet server is not running".into()))?;
        let deleted = running.meta.remove_tablet(tablet_id)?;
        self.tablets.write().remove(tablet_id);
        Ok(deleted)
    }

    pub fn hosted_tablets(&self) -> Vec<String> {
        self.tablets.read().iter().cloned().collect()
    }

    fn component(&self) -> String {
        format!("tablet server {}", self.fs_root.display())
    }
}

#[async_trait]
impl TabletServerHandle for MiniTabletServer {
    async fn start(&self) -> Result<()> {
        let already_running = self.state.lock().is_some();
        if already_running {
            return Err(Error::InvalidArgument("tablet server is already running".into()));
        }

        let meta = TabletMetaStore::open(&self.fs_root.join(TSERVER_META_DIR))
            .map_err(|e| Error::startup(self.component(), e))?;
        let uuid = meta.uuid_or_create().map_err(|e| Error::startup(self.component(), e))?;
        let tablets = meta.tablets().map_err(|e| Error::startup(self.component(), e))?;
        *self.tablets.write() = tablets;

        let listener = TcpListener::bind(loopback_addr(self.rpc_port)).await.map_err(|e| {
            Error::startup(self.component(), format!("bind port {}: {e}", self.rpc_port))
        })?;
        let addr = listener.local_addr().map_err(|e| Error::startup(self.component(), e))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let (registered_tx, registered_rx) = watch::channel(false);

        let rpc_uuid = uuid.clone();
        let rpc = tokio::spawn(serve_requests(
            format!("tserver {uuid}"),
            listener,
            shutdown_rx.clone(),
            None,
            move |req: TabletServerRequest| match req {
                TabletServerRequest::Ping => TabletServerResponse::Pong {
                    uuid: rpc_uuid.clone(),
                },
            },
        ));

        let heartbeater = Heartbeater {
            uuid: uuid.clone(),
            rpc_addr: addr,
            master_addr: self.master_addr,
            tablets: self.tablets.clone(),
            options: self.options,
            registered_tx,
            seq: 0,
        };
        let heartbeats = tokio::spawn(heartbeater.run(shutdown_rx));

        info!("tablet server {} starting on {} (master {})", uuid, addr, self.master_addr);
        *self.uuid.lock() = Some(uuid);
        *self.state.lock() = Some(RunningTabletServer {
            addr,
            meta,
            shutdown_tx,
            registered_rx,
            handles: vec![rpc, heartbeats],
        });
        Ok(())
    }

    async fn wait_registered(
        &self,
        timeout: Duration,
    ) -> Result<()> {
        let mut registered_rx = match self.state.lock().as_ref() {
            Some(running) => running.registered_rx.clone(),
            None => return Err(Error::InvalidArgument("tablet server is not running".into())),
        };

        let registered = match tokio::time::timeout(timeout, registered_rx.wait_for(|registered| *registered)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(Error::startup(self.component(), "stopped before registering")),
            Err(_) => Err(Error::TimedOut {
                what: format!("{} to register with the master", self.component()),
                waited: timeout,
                observed: 0,
            }),
        };
        registered
    }

    fn shutdown(&self) {
        let Some(running) = self.state.lock().take() else {
            debug!("{} already stopped", self.component());
            return;
        };

        let _ = running.shutdown_tx.send(());
        for handle in &running.handles {
            handle.abort();
        }
        if let Err(e) = running.meta.flush() {
            error!("{}: failed to flush metadata store: {:?}", self.component(), e);
        }
        info!("tablet server on {} stopped", running.addr);
    }

    fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    fn bound_addr(&self) -> Option<SocketAddr> {
        self.state.lock().as_ref().map(|s| s.addr)
    }

    fn uuid(&self) -> Option<String> {
        self.uuid.lock().clone()
    }
}

impl Drop for MiniTabletServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
