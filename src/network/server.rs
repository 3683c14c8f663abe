use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

use super::read_frame;
use super::write_frame;

/// Pause after a failed `accept` before trying again, so persistent failures
/// (e.g. descriptor exhaustion) do not spin the accept loop.
pub(crate) const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Source of inbound connections for [`serve_requests`].
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait ConnectionListener: Send + Sync + 'static {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl ConnectionListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Accepts loopback connections until `shutdown_rx` fires (or its sender is
/// dropped), answering every request frame with `handler`.
///
/// `serving_tx` flips to true once the accept loop runs and back to false
/// when it exits.
pub(crate) async fn serve_requests<L, Req, Resp, H>(
    name: String,
    listener: L,
    mut shutdown_rx: watch::Receiver<()>,
    serving_tx: Option<watch::Sender<bool>>,
    handler: H,
) where
    L: ConnectionListener,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
    H: Fn(Req) -> Resp + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    if let Some(tx) = &serving_tx {
        tx.send_replace(true);
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("[{name}] accept loop received shutdown signal");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handler = handler.clone();
                    let shutdown_rx = shutdown_rx.clone();
                    let name = name.clone();
                    tokio::spawn(async move {
                        handle_connection(name, stream, peer, shutdown_rx, handler).await;
                    });
                }
                Err(e) => {
                    warn!("[{name}] accept failed: {:?}", e);
                    sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    if let Some(tx) = &serving_tx {
        tx.send_replace(false);
    }
}

async fn handle_connection<Req, Resp, H>(
    name: String,
    mut stream: TcpStream,
    peer: SocketAddr,
    mut shutdown_rx: watch::Receiver<()>,
    handler: Arc<H>,
) where
    Req: DeserializeOwned,
    Resp: Serialize,
    H: Fn(Req) -> Resp,
{
    let _ = stream.set_nodelay(true);
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            frame = read_frame::<_, Req>(&mut stream) => match frame {
                Ok(Some(req)) => {
                    let resp = (handler.as_ref())(req);
                    if let Err(e) = write_frame(&mut stream, &resp).await {
                        debug!("[{name}] failed to answer {peer}: {:?}", e);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("[{name}] dropping connection from {peer}: {:?}", e);
                    break;
                }
            }
        }
    }
}
