use tablet_minicluster::MiniCluster;
use tablet_minicluster::TabletServerHandle;
use tempfile::tempdir;
use tracing_test::traced_test;

use crate::common::cluster_config;

const TABLET: &str = "tablet-0001";

#[tokio::test]
#[traced_test]
async fn test_replica_count_follows_created_and_deleted_tablets() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(3, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    cluster.wait_for_replica_count(TABLET, 0).await.unwrap();

    for ts in cluster.tablet_servers() {
        assert!(ts.create_tablet(TABLET).unwrap());
    }
    let outcome = cluster.wait_for_replica_locations(TABLET, 3).await.unwrap();
    assert!(outcome.is_converged());
    let locations = outcome.into_observed();
    assert_eq!(locations.len(), 3);
    for ts in cluster.tablet_servers() {
        let uuid = ts.uuid().unwrap();
        let location = locations
            .iter()
            .find(|l| l.ts_uuid == uuid)
            .expect("every server hosts a replica");
        assert_eq!(Some(location.rpc_addr), ts.bound_addr());
        assert_eq!(location.tablet_id, TABLET);
    }

    assert!(cluster.tablet_server(1).delete_tablet(TABLET).unwrap());
    assert!(!cluster.tablet_server(1).delete_tablet(TABLET).unwrap());
    cluster.wait_for_replica_count(TABLET, 2).await.unwrap();
}

#[tokio::test]
async fn test_creating_a_hosted_tablet_again_is_noop() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(1, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    let ts = cluster.tablet_server(0);
    assert!(ts.create_tablet(TABLET).unwrap());
    assert!(!ts.create_tablet(TABLET).unwrap());
    assert_eq!(ts.hosted_tablets(), vec![TABLET.to_string()]);

    cluster.wait_for_replica_count(TABLET, 1).await.unwrap();
}

#[tokio::test]
async fn test_replica_count_times_out_with_last_observation() {
    let dir = tempdir().unwrap();
    let mut config = cluster_config(2, dir.path());
    config.wait.tablet_report_wait_timeout_ms = 300;
    let mut cluster = MiniCluster::new(config).unwrap();
    cluster.start_sync().await.unwrap();

    cluster.tablet_server(0).create_tablet(TABLET).unwrap();
    cluster.wait_for_replica_count(TABLET, 1).await.unwrap();

    let err = cluster.wait_for_replica_count(TABLET, 2).await.unwrap_err();

    match err {
        tablet_minicluster::Error::TimedOut { observed, waited, .. } => {
            assert_eq!(observed, 1);
            assert!(waited.as_millis() >= 300);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replicas_are_reported_per_tablet() {
    let dir = tempdir().unwrap();
    let mut cluster = MiniCluster::new(cluster_config(2, dir.path())).unwrap();
    cluster.start_sync().await.unwrap();

    cluster.tablet_server(0).create_tablet("a").unwrap();
    cluster.tablet_server(0).create_tablet("b").unwrap();
    cluster.tablet_server(1).create_tablet("b").unwrap();

    cluster.wait_for_replica_count("a", 1).await.unwrap();
    cluster.wait_for_replica_count("b", 2).await.unwrap();
    cluster.wait_for_replica_count("c", 0).await.unwrap();
}
