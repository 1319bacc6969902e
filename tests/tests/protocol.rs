use minidfs_tests::{raw_request, TestCluster};
use serde_json::json;

#[tokio::test]
async fn unknown_request_kind_is_rejected_by_every_service() {
    let cluster = TestCluster::start(1).await.unwrap();
    let storage = cluster.storage[0].addr;

    for addr in [cluster.directory, cluster.lock, storage] {
        let reply = raw_request(addr, br#"{"request":"delete","docname":"a"}"#)
            .await
            .unwrap();
        assert_eq!(reply["response"], "error");
        assert_eq!(reply["code"], "protocol");
        assert_eq!(reply["error"], "delete is not a valid request");
    }
}

#[tokio::test]
async fn missing_request_kind_is_rejected() {
    let cluster = TestCluster::start(0).await.unwrap();

    let reply = raw_request(cluster.directory, br#"{"docname":"a"}"#).await.unwrap();
    assert_eq!(reply["response"], "error");
    assert_eq!(reply["error"], "(missing) is not a valid request");
}

#[tokio::test]
async fn malformed_body_gets_a_protocol_error_and_the_server_keeps_serving() {
    let cluster = TestCluster::start(0).await.unwrap();

    let reply = raw_request(cluster.lock, b"not json at all").await.unwrap();
    assert_eq!(reply["response"], "error");
    assert_eq!(reply["code"], "protocol");

    let reply = raw_request(cluster.lock, br#"{"request":"checklock"}"#).await.unwrap();
    assert_eq!(reply["code"], "protocol");

    let reply = raw_request(
        cluster.lock,
        json!({"request": "checklock", "docname": "x", "clientId": "c1"})
            .to_string()
            .as_bytes(),
    )
    .await
    .unwrap();
    assert_eq!(reply["response"], "unlocked");
}

#[tokio::test]
async fn directory_replies_use_the_documented_tags() {
    let cluster = TestCluster::start(1).await.unwrap();
    let node = &cluster.storage[0];

    let open = json!({"request": "open", "docname": "f", "clientId": "c1"}).to_string();
    let reply = raw_request(cluster.directory, open.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "open-null");
    assert_eq!(reply["isFile"], false);
    assert_eq!(reply["port"], node.addr.port());

    let write = json!({"request": "write", "docname": "f", "clientId": "c1", "timestamp": 42}).to_string();
    let reply = raw_request(cluster.directory, write.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "write-null");
    assert_eq!(reply["nodeId"], node.node_id.to_string());

    let reply = raw_request(cluster.directory, write.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "write-exists");

    let reply = raw_request(cluster.directory, open.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "open-exists");
    assert_eq!(reply["isFile"], true);
    assert_eq!(reply["timestamp"], 42);

    let close = json!({"request": "close", "docname": "f", "clientId": "c1"}).to_string();
    let reply = raw_request(cluster.directory, close.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "close");
}

#[tokio::test]
async fn lock_replies_name_the_holder() {
    let cluster = TestCluster::start(0).await.unwrap();

    let obtain = |client: &str| json!({"request": "obtainlock", "docname": "x", "clientId": client}).to_string();

    let reply = raw_request(cluster.lock, obtain("c1").as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "lockgranted");
    assert_eq!(reply["clientId"], "c1");

    let reply = raw_request(cluster.lock, obtain("c1").as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "lockregranted");

    let reply = raw_request(cluster.lock, obtain("c2").as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "locked");
    assert_eq!(reply["clientId"], "c1");

    let check = json!({"request": "checklock", "docname": "x", "clientId": "c1"}).to_string();
    let reply = raw_request(cluster.lock, check.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "lockowned");
}

#[tokio::test]
async fn storage_node_serves_raw_reads_and_writes() {
    let cluster = TestCluster::start(1).await.unwrap();
    let node = &cluster.storage[0];

    let write = json!({"request": "write", "docname": "raw", "data": [104, 105]}).to_string();
    let reply = raw_request(node.addr, write.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "write");
    assert_eq!(reply["nodeId"], node.node_id.to_string());

    let read = json!({"request": "read", "docname": "raw"}).to_string();
    let reply = raw_request(node.addr, read.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "read");
    assert_eq!(reply["data"], json!([104, 105]));

    let read = json!({"request": "read", "docname": "missing"}).to_string();
    let reply = raw_request(node.addr, read.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "error");
    assert_eq!(reply["code"], "notfound");
}

#[tokio::test]
async fn join_with_a_known_id_moves_the_node() {
    let cluster = TestCluster::start(1).await.unwrap();
    let node = cluster.storage[0].clone();

    let join = json!({
        "request": "join",
        "nodeId": node.node_id.to_string(),
        "address": "127.0.0.1",
        "port": 1,
    })
    .to_string();
    let reply = raw_request(cluster.directory, join.as_bytes()).await.unwrap();
    assert_eq!(reply["response"], "join");
    assert_eq!(reply["nodeId"], node.node_id.to_string());

    let state = cluster.directory_state();
    let state = state.read().await;
    assert_eq!(state.node_count(), 1);
    assert_eq!(state.nodes().first().map(|n| n.port), Some(1));
}

#[tokio::test]
async fn join_with_an_empty_id_is_assigned_a_fresh_one() {
    let cluster = TestCluster::start(0).await.unwrap();

    let join = |node_id: &str, port: u16| {
        json!({"request": "join", "nodeId": node_id, "address": "127.0.0.1", "port": port}).to_string()
    };

    let first = raw_request(cluster.directory, join("", 4242).as_bytes()).await.unwrap();
    assert_eq!(first["response"], "join");
    let second = raw_request(cluster.directory, join("", 4243).as_bytes()).await.unwrap();
    assert_eq!(second["response"], "join");
    assert_ne!(first["nodeId"], second["nodeId"]);

    let named = raw_request(cluster.directory, join("storage-a", 4244).as_bytes()).await.unwrap();
    assert_eq!(named["response"], "join");
    let again = raw_request(cluster.directory, join("storage-a", 4245).as_bytes()).await.unwrap();
    assert_eq!(again["nodeId"], named["nodeId"]);

    let state = cluster.directory_state();
    assert_eq!(state.read().await.node_count(), 3);
}
