use std::net::TcpListener;
use std::path::Path;

use tablet_minicluster::ClusterConfig;
use tablet_minicluster::TabletServerOptions;
use tablet_minicluster::WaitConfig;

/// Upper bound for any convergence in these tests.
pub const WAIT_TIMEOUT_MS: u64 = 10_000;

pub const HEARTBEAT_INTERVAL_MS: u64 = 20;

/// Config for a loopback cluster rooted at `root` with a short heartbeat.
pub fn cluster_config(
    num_tablet_servers: i32,
    root: &Path,
) -> ClusterConfig {
    ClusterConfig {
        num_tablet_servers,
        data_root: root.to_path_buf(),
        wait: WaitConfig {
            registration_wait_timeout_ms: WAIT_TIMEOUT_MS,
            tablet_report_wait_timeout_ms: WAIT_TIMEOUT_MS,
            master_startup_timeout_ms: WAIT_TIMEOUT_MS,
            poll_interval_ms: 10,
        },
        tablet_server: TabletServerOptions {
            heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn get_available_ports(count: usize) -> Vec<u16> {
    let listeners: Vec<TcpListener> = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    listeners
        .iter()
        .map(|listener| listener.local_addr().unwrap().port())
        .collect()
}
