use bytes::Bytes;
use client::{ClientError, LockGrant, LockState};
use minidfs_tests::{ClusterOptions, TestCluster};
use std::time::Duration;

async fn cluster_with_lease(lease_timeout_ms: u64) -> TestCluster {
    TestCluster::start_with(ClusterOptions {
        storage_nodes: 2,
        lease_timeout_ms,
        ..ClusterOptions::default()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn only_one_client_holds_a_live_lease() {
    let cluster = cluster_with_lease(10_000).await;
    let c1 = cluster.client();
    let c2 = cluster.client();

    assert!(matches!(c1.obtain_lock("x").await.unwrap(), LockGrant::Granted(_)));

    match c2.obtain_lock("x").await.unwrap() {
        LockGrant::Locked(lease) => assert_eq!(lease.client_id, c1.id()),
        other => panic!("unexpected {:?}", other),
    }
    match c2.check_lock("x").await.unwrap() {
        LockState::Locked(lease) => assert_eq!(lease.client_id, c1.id()),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(c1.check_lock("x").await.unwrap(), LockState::Owned(_)));
}

#[tokio::test]
async fn expired_lease_is_reclaimed_by_another_client() {
    let cluster = cluster_with_lease(200).await;
    let c1 = cluster.client();
    let c2 = cluster.client();

    assert!(matches!(c1.obtain_lock("x").await.unwrap(), LockGrant::Granted(_)));
    assert!(matches!(c2.obtain_lock("x").await.unwrap(), LockGrant::Locked(_)));

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(matches!(c2.check_lock("x").await.unwrap(), LockState::Unlocked));
    assert!(matches!(c2.obtain_lock("x").await.unwrap(), LockGrant::Granted(_)));
    assert!(matches!(c1.check_lock("x").await.unwrap(), LockState::Locked(_)));
}

#[tokio::test]
async fn owner_can_extend_its_lease() {
    let cluster = cluster_with_lease(10_000).await;
    let c1 = cluster.client();

    let first = match c1.obtain_lock("x").await.unwrap() {
        LockGrant::Granted(lease) => lease,
        other => panic!("unexpected {:?}", other),
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    match c1.obtain_lock("x").await.unwrap() {
        LockGrant::Regranted(lease) => assert!(lease.expires_at() > first.expires_at()),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn checking_does_not_extend_a_lease() {
    let cluster = cluster_with_lease(300).await;
    let c1 = cluster.client();
    let c2 = cluster.client();

    c1.obtain_lock("x").await.unwrap();
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        c1.check_lock("x").await.unwrap();
    }

    assert!(matches!(c2.obtain_lock("x").await.unwrap(), LockGrant::Granted(_)));
}

#[tokio::test]
async fn leases_are_per_file() {
    let cluster = cluster_with_lease(10_000).await;
    let c1 = cluster.client();
    let c2 = cluster.client();

    c1.obtain_lock("x").await.unwrap();
    assert!(matches!(c2.obtain_lock("y").await.unwrap(), LockGrant::Granted(_)));
    assert!(matches!(c2.check_lock("z").await.unwrap(), LockState::Unlocked));
}

#[tokio::test]
async fn write_under_another_clients_lease_is_a_conflict() {
    let cluster = cluster_with_lease(10_000).await;
    let c1 = cluster.client();
    let c2 = cluster.client();

    c1.write("report.txt", "draft by c1").await.unwrap();

    // c1 still holds the lease its write took
    match c2.check_lock("report.txt").await.unwrap() {
        LockState::Locked(lease) => assert_eq!(lease.client_id, c1.id()),
        other => panic!("unexpected {:?}", other),
    }

    match c2.write("report.txt", "overwrite by c2").await {
        Err(ClientError::Conflict { docname, owner }) => {
            assert_eq!(docname, "report.txt");
            assert_eq!(owner, c1.id());
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(c2.cached("report.txt").await.is_none());
    assert_eq!(
        c2.read("report.txt").await.unwrap(),
        Bytes::from_static(b"draft by c1")
    );
}

#[tokio::test]
async fn concurrent_writers_to_one_file_never_both_succeed_within_a_lease() {
    let cluster = cluster_with_lease(10_000).await;
    let clients: Vec<_> = (0..8).map(|_| cluster.client()).collect();

    let writes = clients
        .iter()
        .map(|client| client.write("contended", format!("from {}", client.id())));
    let results = futures::future::join_all(writes).await;

    let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(ClientError::Conflict { .. }))));

    let winner = clients
        .iter()
        .zip(&results)
        .find(|(_, r)| r.is_ok())
        .map(|(client, _)| client.id().to_string())
        .unwrap();
    let reader = cluster.client();
    assert_eq!(
        reader.read("contended").await.unwrap(),
        Bytes::from(format!("from {}", winner))
    );
}
