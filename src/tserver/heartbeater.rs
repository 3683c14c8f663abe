use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::timeout;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;

use crate::network::call;
use crate::network::MasterRequest;
use crate::network::MasterResponse;
use crate::network::TsHeartbeat;
use crate::Result;
use crate::TabletServerOptions;
use crate::WireError;

/// Reports the full tablet set to the master every heartbeat interval over a
/// single persistent connection, reconnecting on the next tick after any
/// failure.
pub(crate) struct Heartbeater {
    pub(crate) uuid: String,
    pub(crate) rpc_addr: SocketAddr,
    pub(crate) master_addr: SocketAddr,
    pub(crate) tablets: Arc<RwLock<BTreeSet<String>>>,
    pub(crate) options: TabletServerOptions,
    pub(crate) registered_tx: watch::Sender<bool>,
    pub(crate) seq: u64,
}

impl Heartbeater {
    pub(crate) async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<()>,
    ) {
        let mut ticker = interval(self.options.heartbeat_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut conn: Option<TcpStream> = None;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("[{}] heartbeater received shutdown signal", self.uuid);
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.heartbeat(&mut conn).await {
                        debug!("[{}] heartbeat to {} failed: {:?}", self.uuid, self.master_addr, e);
                        conn = None;
                    }
                }
            }
        }
    }

    async fn heartbeat(
        &mut self,
        conn: &mut Option<TcpStream>,
    ) -> Result<()> {
        let stream = match conn.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };
        let stream = conn.insert(stream);

        self.seq += 1;
        let req = MasterRequest::Heartbeat(TsHeartbeat {
            uuid: self.uuid.clone(),
            rpc_addr: self.rpc_addr,
            tablets: self.tablets.read().iter().cloned().collect(),
            seq: self.seq,
        });

        match call(stream, &req).await? {
            MasterResponse::HeartbeatAck {
                newly_registered,
                num_tablet_servers,
            } => {
                if newly_registered {
                    info!(
                        "[{}] registered with master {} ({} tablet servers)",
                        self.uuid, self.master_addr, num_tablet_servers
                    );
                }
                self.registered_tx.send_replace(true);
                Ok(())
            }
            other => Err(WireError::UnexpectedResponse(format!("{other:?}")).into()),
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        let stream = timeout(self.options.connect_timeout(), TcpStream::connect(self.master_addr))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to master {} timed out", self.master_addr),
                )
            })??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
