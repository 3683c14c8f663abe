use tablet_minicluster::MiniCluster;
use tablet_minicluster::TabletServerHandle;
use tempfile::tempdir;
use tracing_test::traced_test;

use crate::common::cluster_config;

#[tokio::test]
async fn test_add_tablet_server_before_start_is_rejected() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(1, dir.path())).unwrap();

    let err = cluster.add_tablet_server().await.unwrap_err();

    assert!(err.is_invalid_argument());
    assert_eq!(cluster.num_tablet_servers(), 0);
}

#[tokio::test]
#[traced_test]
async fn test_added_tablet_servers_register() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(1, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    cluster.add_tablet_server().await.unwrap();
    cluster.add_tablet_server().await.unwrap();
    assert_eq!(cluster.num_tablet_servers(), 3);

    let descs = cluster
        .wait_for_tablet_server_descriptors(3)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(descs.len(), 3);

    let added = cluster.tablet_server(2);
    assert_eq!(cluster.tablet_server_fs_root(2), dir.path().join("ts-2"));
    let uuid = added.uuid().unwrap();
    let found = cluster.find_tablet_server(&uuid).expect("added server is known");
    assert_eq!(found.bound_addr(), added.bound_addr());
}

#[tokio::test]
async fn test_added_tablet_server_uses_ephemeral_port() {
    let dir = tempdir().unwrap();
    let mut config = cluster_config(0, dir.path());
    config.tserver_rpc_ports = vec![1];
    let mut cluster = MiniCluster::new(config).unwrap();
    cluster.start_sync().await.unwrap();

    cluster.add_tablet_server().await.unwrap();

    let port = cluster.tablet_server(0).bound_addr().unwrap().port();
    assert_ne!(port, 0);
    assert_ne!(port, 1);
    cluster.wait_for_tablet_server_count(1).await.unwrap();
}
