use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tablet_minicluster::utils::net::is_server_ready;
use tablet_minicluster::ClusterConfig;
use tablet_minicluster::MasterHandle;
use tablet_minicluster::MiniCluster;
use tablet_minicluster::TabletServerHandle;
use tempfile::tempdir;
use tracing_test::traced_test;

use crate::common::cluster_config;
use crate::common::get_available_ports;

#[tokio::test]
#[traced_test]
async fn test_default_cluster_starts_one_tablet_server() {
    let mut cluster = MiniCluster::new(ClusterConfig::default()).unwrap();

    cluster.start_sync().await.unwrap();

    assert!(cluster.is_running());
    assert_eq!(cluster.num_tablet_servers(), 1);
    let master = cluster.master().expect("master present while running");
    assert_eq!(master.num_registered_tablet_servers(), 1);
    assert!(cluster.fs_root().is_dir());

    let root = cluster.fs_root().to_path_buf();
    cluster.shutdown();
    assert!(!cluster.is_running());
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
#[traced_test]
async fn test_three_tablet_servers_register_with_distinct_roots() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(3, dir.path())).unwrap();

    cluster.start_sync().await.unwrap();

    let roots: HashSet<_> = (0..3).map(|idx| cluster.tablet_server_fs_root(idx)).collect();
    assert_eq!(roots.len(), 3);
    assert!(!roots.contains(&cluster.master_fs_root()));
    for root in roots.iter().chain(std::iter::once(&cluster.master_fs_root())) {
        assert!(root.is_dir(), "{} should exist", root.display());
    }

    let descs = cluster
        .wait_for_tablet_server_descriptors(3)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(descs.len(), 3);
    let registered: HashSet<_> = descs.iter().map(|d| d.uuid.clone()).collect();
    for ts in cluster.tablet_servers() {
        let uuid = ts.uuid().expect("started tablet server has a uuid");
        assert!(registered.contains(&uuid));
        assert_eq!(
            descs.iter().find(|d| d.uuid == uuid).map(|d| d.rpc_addr),
            ts.bound_addr()
        );
    }

    cluster.shutdown();
    cluster.shutdown();
    assert!(!cluster.is_running());
    assert!(cluster.master().is_none());
    assert_eq!(cluster.num_tablet_servers(), 0);
}

#[tokio::test]
async fn test_zero_tablet_servers_is_master_only() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(0, dir.path())).unwrap();

    cluster.start_sync().await.unwrap();

    assert!(cluster.is_running());
    assert_eq!(cluster.num_tablet_servers(), 0);
    cluster.wait_for_tablet_server_count(0).await.unwrap();
}

#[tokio::test]
async fn test_configured_ports_are_used() {
    let dir = tempdir().unwrap();
    let ports = get_available_ports(3);
    let mut config = cluster_config(3, dir.path());
    config.master_rpc_port = ports[0];
    config.tserver_rpc_ports = vec![ports[1], ports[2]];
    let mut cluster = MiniCluster::new(config).unwrap();

    cluster.start_sync().await.unwrap();

    let master_addr = cluster.master().and_then(|m| m.bound_addr()).unwrap();
    assert_eq!(master_addr.port(), ports[0]);
    assert!(master_addr.ip().is_loopback());
    assert_eq!(cluster.tablet_server(0).bound_addr().unwrap().port(), ports[1]);
    assert_eq!(cluster.tablet_server(1).bound_addr().unwrap().port(), ports[2]);
    assert_ne!(cluster.tablet_server(2).bound_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn test_master_port_conflict_is_startup_failure() {
    let dir = tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = cluster_config(1, dir.path());
    config.master_rpc_port = taken.local_addr().unwrap().port();
    let mut cluster = MiniCluster::new(config).unwrap();

    let err = cluster.start().await.unwrap_err();

    assert!(err.is_startup_failure(), "got {err:?}");
    assert!(!cluster.is_running());
    assert_eq!(cluster.num_tablet_servers(), 0);
    cluster.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_listeners() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(1, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    let master_addr = cluster.master().and_then(|m| m.bound_addr()).unwrap();
    let ts_addr = cluster.tablet_server(0).bound_addr().unwrap();
    assert!(is_server_ready(master_addr).await);
    assert!(is_server_ready(ts_addr).await);

    cluster.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!is_server_ready(master_addr).await);
    assert!(!is_server_ready(ts_addr).await);
}

#[tokio::test]
async fn test_tablet_server_handle_is_stopped_after_shutdown() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(2, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    let ts = cluster.tablet_server(1).clone();
    let uuid = ts.uuid();
    cluster.shutdown();

    assert_eq!(Arc::strong_count(&ts), 1);
    assert!(!ts.is_running());
    assert!(ts.bound_addr().is_none());
    assert_eq!(ts.uuid(), uuid);
    assert!(ts.create_tablet("t").unwrap_err().is_invalid_argument());
}

#[tokio::test]
async fn test_waits_after_shutdown_are_rejected() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(1, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();
    cluster.shutdown();

    assert!(cluster
        .wait_for_tablet_server_count(1)
        .await
        .unwrap_err()
        .is_invalid_argument());
    assert!(cluster
        .wait_for_replica_count("t", 0)
        .await
        .unwrap_err()
        .is_invalid_argument());
}
