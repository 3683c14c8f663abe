//! In-process master bound to the loopback interface.
//!
//! ## Lifecycle
//! - `start()` persists/loads the instance id under the fs root, binds the
//!   listener and spawns the accept loop, then returns.
//! - Heartbeats register tablet servers in a [`TsRegistry`]; the registry is
//!   reset on every start.
//! - `shutdown()` signals the accept loop and every open connection through a
//!   `watch` channel. It is synchronous so it can run from `Drop`.

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;

use super::MasterHandle;
use super::ReplicaLocation;
use super::TsDescriptor;
use super::TsRegistry;
use crate::metrics::HEARTBEATS_RECEIVED;
use crate::metrics::REGISTERED_TABLET_SERVERS;
use crate::network::serve_requests;
use crate::network::MasterRequest;
use crate::network::MasterResponse;
use crate::utils::file_io::read_or_create_instance_id;
use crate::utils::net::loopback_addr;
use crate::Error;
use crate::Result;

/// File under the master root holding its persistent instance id.
pub const MASTER_INSTANCE_FILE: &str = "instance";

const COMPONENT: &str = "master";

pub struct MiniMaster {
    fs_root: PathBuf,
    rpc_port: u16,
    registry: Arc<TsRegistry>,
    state: Mutex<Option<RunningMaster>>,
}

struct RunningMaster {
    instance_id: String,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<()>,
    serving_rx: watch::Receiver<bool>,
    handle: JoinHandle<()>,
}

impl MiniMaster {
    /// `rpc_port` 0 binds an ephemeral port.
    pub fn new(
        fs_root: impl Into<PathBuf>,
        rpc_port: u16,
    ) -> Self {
        Self {
            fs_root: fs_root.into(),
            rpc_port,
            registry: Arc::new(TsRegistry::new()),
            state: Mutex::new(None),
        }
    }

    pub fn fs_root(&self) -> &Path {
        &self.fs_root
    }

    /// Persistent id of this master, available while running.
    pub fn instance_id(&self) -> Option<String> {
        self.state.lock().as_ref().map(|s| s.instance_id.clone())
    }

    pub fn num_registered_tablet_servers(&self) -> usize {
        self.registry.len()
    }

    /// Drops the label sets this instance exported, so stopped masters do
    /// not linger in the registry.
    fn release_metric_labels(
        &self,
        instance_id: &str,
    ) {
        let _ = REGISTERED_TABLET_SERVERS.remove_label_values(&[instance_id]);
        for desc in self.registry.descriptors() {
            let _ = HEARTBEATS_RECEIVED.remove_label_values(&[&desc.uuid]);
        }
    }

    fn handle_request(
        registry: &TsRegistry,
        instance_id: &str,
        req: MasterRequest,
    ) -> MasterResponse {
        match req {
            MasterRequest::Ping => MasterResponse::Pong {
                instance_id: instance_id.to_string(),
            },
            MasterRequest::Heartbeat(heartbeat) => {
                HEARTBEATS_RECEIVED.with_label_values(&[&heartbeat.uuid]).inc();
                let newly_registered = registry.record_heartbeat(heartbeat);
                let num_tablet_servers = registry.len();
                REGISTERED_TABLET_SERVERS
                    .with_label_values(&[instance_id])
                    .set(num_tablet_servers as i64);
                MasterResponse::HeartbeatAck {
                    newly_registered,
                    num_tablet_servers,
                }
            }
        }
    }
}

#[async_trait]
impl MasterHandle for MiniMaster {
    async fn start(&self) -> Result<()> {
        let already_running = self.state.lock().is_some();
        if already_running {
            return Err(Error::InvalidArgument("master is already running".into()));
        }

        let instance_id = read_or_create_instance_id(&self.fs_root.join(MASTER_INSTANCE_FILE))
            .map_err(|e| Error::startup(COMPONENT, e))?;
        let listener = TcpListener::bind(loopback_addr(self.rpc_port))
            .await
            .map_err(|e| Error::startup(COMPONENT, format!("bind port {}: {e}", self.rpc_port)))?;
        let addr = listener.local_addr().map_err(|e| Error::startup(COMPONENT, e))?;

        self.registry.clear();

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let (serving_tx, serving_rx) = watch::channel(false);
        let registry = self.registry.clone();
        let id = instance_id.clone();
        let handle = tokio::spawn(serve_requests(
            format!("master {addr}"),
            listener,
            shutdown_rx,
            Some(serving_tx),
            move |req: MasterRequest| MiniMaster::handle_request(&registry, &id, req),
        ));

        info!("master {} starting on {}", instance_id, addr);
        *self.state.lock() = Some(RunningMaster {
            instance_id,
            addr,
            shutdown_tx,
            serving_rx,
            handle,
        });
        Ok(())
    }

    async fn wait_until_serving(
        &self,
        timeout: Duration,
    ) -> Result<()> {
        let mut serving_rx = match self.state.lock().as_ref() {
            Some(running) => running.serving_rx.clone(),
            None => return Err(Error::InvalidArgument("master is not running".into())),
        };

        let serving = match tokio::time::timeout(timeout, serving_rx.wait_for(|serving| *serving)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(Error::startup(COMPONENT, "accept loop exited before serving")),
            Err(_) => Err(Error::TimedOut {
                what: "master to start serving".into(),
                waited: timeout,
                observed: 0,
            }),
        };
        serving
    }

    fn shutdown(&self) {
        if let Some(running) = self.state.lock().take() {
            let _ = running.shutdown_tx.send(());
            running.handle.abort();
            self.release_metric_labels(&running.instance_id);
            info!("master {} on {} stopped", running.instance_id, running.addr);
        } else {
            debug!("master already stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    fn bound_addr(&self) -> Option<SocketAddr> {
        self.state.lock().as_ref().map(|s| s.addr)
    }

    async fn list_registered_tablet_servers(&self) -> Result<Vec<TsDescriptor>> {
        Ok(self.registry.descriptors())
    }

    async fn list_replica_locations(
        &self,
        tablet_id: &str,
    ) -> Result<Vec<ReplicaLocation>> {
        Ok(self.registry.replica_locations(tablet_id))
    }
}

impl Drop for MiniMaster {
    fn drop(&mut self) {
        self.shutdown();
    }
}
