use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use tokio::net::TcpStream;

/// Every component binds the loopback interface; `port` 0 is ephemeral.
pub(crate) fn loopback_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

pub async fn is_server_ready(addr: SocketAddr) -> bool {
    TcpStream::connect(addr).await.is_ok()
}
