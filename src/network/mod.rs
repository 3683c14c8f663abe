//! Loopback protocol spoken between the bundled tablet servers and master.
//!
//! Every message is one length-prefixed frame: a big-endian `u32` byte count
//! followed by a `bincode` encoded body. A connection carries strict
//! request/response pairs; the side that opened the connection always speaks
//! first.

mod codec;
mod server;
pub use codec::*;
pub(crate) use server::*;


use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

/// Periodic status report of one tablet server. Always carries the full set
/// of hosted tablets, so the master never has to merge incremental reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsHeartbeat {
    pub uuid: String,
    pub rpc_addr: SocketAddr,
    pub tablets: Vec<String>,
    /// Monotonic per-server sequence number, starting at 1
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterRequest {
    Ping,
    Heartbeat(TsHeartbeat),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterResponse {
    Pong {
        instance_id: String,
    },
    HeartbeatAck {
        /// True when this heartbeat registered the server for the first time
        newly_registered: bool,
        num_tablet_servers: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabletServerRequest {
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabletServerResponse {
    Pong { uuid: String },
}
