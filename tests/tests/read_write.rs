use bytes::Bytes;
use client::ClientError;
use directory::{DirectoryRequest, DirectoryResponse, Timestamp, WriteRequest};
use minidfs_tests::{ClusterOptions, TestCluster};

#[tokio::test]
async fn write_then_read_round_trips_through_storage() {
    let cluster = TestCluster::start(3).await.unwrap();
    let writer = cluster.client();
    let reader = cluster.client();

    let receipt = writer.write("notes.txt", "hello world").await.unwrap();
    assert!(receipt.created);
    assert_eq!(receipt.committed, receipt.timestamp);

    let data = reader.read("notes.txt").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"hello world"));

    // the bytes are on the node the directory chose and nowhere else
    let location = reader.locate("notes.txt").await.unwrap().unwrap();
    assert_eq!(location.node_id, receipt.node_id);
    assert_eq!(location.timestamp, receipt.timestamp);
    assert!(cluster.storage_node(receipt.node_id).is_some());
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let cluster = TestCluster::start(2).await.unwrap();
    let writer = cluster.client();
    let reader = cluster.client();

    writer.write("a", "v1").await.unwrap();

    assert_eq!(reader.read("a").await.unwrap(), Bytes::from_static(b"v1"));
    assert_eq!(reader.read("a").await.unwrap(), Bytes::from_static(b"v1"));

    let stats = reader.cache_stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn writer_reads_its_own_write_from_cache() {
    let cluster = TestCluster::start(1).await.unwrap();
    let client = cluster.client();

    let receipt = client.write("a", "mine").await.unwrap();
    let entry = client.cached("a").await.unwrap();
    assert_eq!(entry.timestamp, receipt.timestamp);

    assert_eq!(client.read("a").await.unwrap(), Bytes::from_static(b"mine"));
    assert_eq!(client.cache_stats().await.hits, 1);
}

#[tokio::test]
async fn newer_write_invalidates_other_clients_cache() {
    let cluster = TestCluster::start_with(ClusterOptions {
        storage_nodes: 2,
        lease_timeout_ms: 100,
        ..ClusterOptions::default()
    })
    .await
    .unwrap();
    let first = cluster.client();
    let second = cluster.client();

    first.write("shared", "v1").await.unwrap();
    assert_eq!(second.read("shared").await.unwrap(), Bytes::from_static(b"v1"));

    // let the first writer's lease lapse so the second can write
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    let receipt = second.write("shared", "v2").await.unwrap();
    assert!(!receipt.created);

    let data = first.read("shared").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"v2"));
    assert_eq!(first.cached("shared").await.unwrap().timestamp, receipt.timestamp);
}

#[tokio::test]
async fn overwrite_replaces_whole_content_on_the_same_node() {
    let cluster = TestCluster::start(3).await.unwrap();
    let client = cluster.client();

    let first = client.write("doc", "a much longer first version").await.unwrap();
    let second = client.write("doc", "short").await.unwrap();

    assert_eq!(first.node_id, second.node_id);
    assert!(second.timestamp > first.timestamp);
    assert!(!second.created);

    let reader = cluster.client();
    assert_eq!(reader.read("doc").await.unwrap(), Bytes::from_static(b"short"));
}

#[tokio::test]
async fn reading_an_unknown_file_is_not_found() {
    let cluster = TestCluster::start(1).await.unwrap();
    let client = cluster.client();

    assert!(matches!(client.read("ghost").await, Err(ClientError::NotFound(name)) if name == "ghost"));
    assert!(client.locate("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn reading_with_no_storage_nodes_is_not_found() {
    let cluster = TestCluster::start(0).await.unwrap();
    let client = cluster.client();

    assert!(matches!(client.read("ghost").await, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn writing_with_no_storage_nodes_fails_cleanly() {
    let cluster = TestCluster::start(0).await.unwrap();
    let client = cluster.client();

    assert!(matches!(client.write("a", "x").await, Err(ClientError::NoNodesAvailable)));
    assert!(client.cached("a").await.is_none());
    assert_eq!(cluster.directory_state().read().await.file_count(), 0);
}

#[tokio::test]
async fn reserved_but_never_written_file_reads_as_not_found() {
    let cluster = TestCluster::start(1).await.unwrap();

    let reply: DirectoryResponse = network::send_request(
        cluster.directory,
        &DirectoryRequest::Write(WriteRequest {
            docname: "dangling".to_string(),
            client_id: "crashed-client".to_string(),
            timestamp: Timestamp::now(),
        }),
        cluster.request_timeout(),
    )
    .await
    .unwrap();
    assert!(matches!(reply, DirectoryResponse::WriteNull(_)));

    let client = cluster.client();
    assert!(client.locate("dangling").await.unwrap().is_some());
    assert!(matches!(client.read("dangling").await, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn concurrent_first_writes_place_the_file_once() {
    let cluster = TestCluster::start(5).await.unwrap();
    let directory = cluster.directory;
    let deadline = cluster.request_timeout();

    let requests = (0..16).map(|i| async move {
        network::send_request::<_, DirectoryResponse>(
            directory,
            &DirectoryRequest::Write(WriteRequest {
                docname: "contended".to_string(),
                client_id: format!("client-{}", i),
                timestamp: Timestamp(i + 1),
            }),
            deadline,
        )
        .await
    });

    let mut created = 0;
    let mut nodes = Vec::new();
    for reply in futures::future::join_all(requests).await {
        match reply.unwrap() {
            DirectoryResponse::WriteNull(reply) => {
                created += 1;
                nodes.push(reply.node_id);
            }
            DirectoryResponse::WriteExists(reply) => nodes.push(reply.node_id),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert_eq!(created, 1);
    nodes.dedup();
    assert_eq!(nodes.len(), 1);
    assert_eq!(cluster.directory_state().read().await.file_count(), 1);
}

#[tokio::test]
async fn files_spread_over_registered_nodes() {
    let cluster = TestCluster::start(3).await.unwrap();
    let client = cluster.client();

    let mut used = std::collections::HashSet::new();
    for i in 0..40 {
        let receipt = client.write(&format!("file-{}", i), format!("body {}", i)).await.unwrap();
        used.insert(receipt.node_id);
    }

    // random placement over three nodes; forty files missing a node is vanishingly unlikely
    assert!(used.len() > 1);
    for node_id in used {
        assert!(cluster.storage_node(node_id).is_some());
    }
}

#[tokio::test]
async fn node_added_later_receives_new_files_only_after_joining() {
    let mut cluster = TestCluster::start(0).await.unwrap();
    let client = cluster.client();

    assert!(matches!(client.write("late", "x").await, Err(ClientError::NoNodesAvailable)));

    let node = cluster.add_storage_node().await.unwrap();
    let receipt = client.write("late", "x").await.unwrap();
    assert_eq!(receipt.node_id, node.node_id);
    assert_eq!(client.read("late").await.unwrap(), Bytes::from_static(b"x"));
}

#[tokio::test]
async fn bounded_cache_refetches_evicted_files() {
    let cluster = TestCluster::start_with(ClusterOptions {
        storage_nodes: 1,
        cache_capacity: Some(1),
        ..ClusterOptions::default()
    })
    .await
    .unwrap();
    let client = cluster.client();

    client.write("one", "1").await.unwrap();
    client.write("two", "2").await.unwrap();
    assert!(client.cached("one").await.is_none());

    assert_eq!(client.read("one").await.unwrap(), Bytes::from_static(b"1"));
    let stats = client.cache_stats().await;
    assert_eq!(stats.misses, 1);
    assert!(stats.evictions >= 1);
}

#[tokio::test]
async fn largest_allowed_file_round_trips_and_one_byte_more_is_refused() {
    let cluster = TestCluster::start_with(ClusterOptions {
        storage_nodes: 1,
        request_timeout_ms: 30_000,
        ..ClusterOptions::default()
    })
    .await
    .unwrap();
    let writer = cluster.client();
    let reader = cluster.client();

    // 255 is the widest byte value in the JSON encoding
    let body = Bytes::from(vec![255u8; storage::MAX_FILE_BYTES]);
    writer.write("big", body.clone()).await.unwrap();
    assert_eq!(reader.read("big").await.unwrap(), body);

    let too_big = vec![255u8; storage::MAX_FILE_BYTES + 1];
    assert!(matches!(
        writer.write("bigger", too_big).await,
        Err(ClientError::TooLarge { .. })
    ));
    assert!(writer.locate("bigger").await.unwrap().is_none());
}
