//! Fixtures shared by the unit tests: a queue-backed mock server factory and
//! canned master/tablet-server mocks.

pub use mock_factory::*;

use std::net::SocketAddr;
use std::path::Path;

use crate::ClusterConfig;
use crate::ReplicaLocation;
use crate::TsDescriptor;
use crate::WaitConfig;

pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Config rooted at `root` with short deadlines.
pub fn test_config(
    num_tablet_servers: i32,
    root: &Path,
) -> ClusterConfig {
    ClusterConfig {
        num_tablet_servers,
        data_root: root.to_path_buf(),
        wait: WaitConfig {
            registration_wait_timeout_ms: 1000,
            tablet_report_wait_timeout_ms: 1000,
            master_startup_timeout_ms: 1000,
            poll_interval_ms: 10,
        },
        ..Default::default()
    }
}

pub fn descriptor(idx: u64) -> TsDescriptor {
    TsDescriptor {
        uuid: format!("ts-uuid-{idx}"),
        rpc_addr: loopback(9100 + idx as u16),
        registration_seq: idx,
        registered_at_ms: 0,
        last_heartbeat_ms: 0,
        last_heartbeat_seq: 1,
        tablets: vec![],
    }
}

pub fn descriptors(n: usize) -> Vec<TsDescriptor> {
    (0..n as u64).map(descriptor).collect()
}

pub fn replicas(
    tablet_id: &str,
    n: usize,
) -> Vec<ReplicaLocation> {
    (0..n as u64)
        .map(|idx| ReplicaLocation {
            tablet_id: tablet_id.to_string(),
            ts_uuid: format!("ts-uuid-{idx}"),
            rpc_addr: loopback(9100 + idx as u16),
        })
        .collect()
}
