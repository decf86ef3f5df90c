use pretty_assertions::assert_eq;
use std::sync::Arc;
use trellis_crypto::Identity;
use trellis_node::{
    build_router, load_or_generate_identity, Node, NodeConfig, NodeStatus, WatchedPath,
};
use trellis_peer::{PeerConfig, PeerEvent};
use trellis_sync::Priority;

fn test_config() -> NodeConfig {
    NodeConfig {
        peer: PeerConfig::with_local_id("node-a"),
        watch: vec![
            WatchedPath {
                path: "notes".to_string(),
                priority: Priority::High,
            },
            WatchedPath {
                path: "boards".to_string(),
                priority: Priority::Low,
            },
        ],
        ..NodeConfig::default()
    }
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(node: Arc<Node>) -> String {
    let app = build_router(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

// ── Status endpoint ──────────────────────────────────────────────

#[tokio::test]
async fn status_endpoint_reports_node_state() {
    let identity = Identity::generate();
    let public_key = identity.public().to_string();
    let node = Arc::new(Node::start(test_config(), identity).await.unwrap());
    node.handle_peer_event(PeerEvent::Connected {
        id: "node-b".into(),
        url: "wss://b.example".into(),
    })
    .await;

    let base = spawn_test_server(node.clone()).await;
    let resp = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: NodeStatus = resp.json().await.unwrap();
    assert_eq!(body.peer_id, "node-a");
    assert_eq!(body.public_key, public_key);
    assert_eq!(body.watched_paths, vec!["boards", "notes"]);
    assert_eq!(body.peers.len(), 1);
    assert_eq!(body.peers[0].id, "node-b");
    assert_eq!(body.topology.total_peers, 1);
    assert_eq!(body.topology.total_connections, 0);
}

#[tokio::test]
async fn status_endpoint_content_type_is_json() {
    let node = Arc::new(
        Node::start(NodeConfig::default(), Identity::generate())
            .await
            .unwrap(),
    );
    let base = spawn_test_server(node).await;
    let resp = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap();

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let node = Arc::new(
        Node::start(NodeConfig::default(), Identity::generate())
            .await
            .unwrap(),
    );
    let base = spawn_test_server(node).await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn shutdown_stops_sync() {
    let node = Node::start(test_config(), Identity::generate())
        .await
        .unwrap();
    node.shutdown().await;
    assert!(node.sync().is_stopped());
    assert!(node.status().await.watched_paths.is_empty());
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = NodeConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.sync, NodeConfig::default().sync);
    assert_eq!(config.http.port, 4002);
    assert!(config.watch.is_empty());
}

#[test]
fn partial_config_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trellis.toml");
    std::fs::write(
        &path,
        r#"
[sync]
max_attempts = 5

[peer]
local_id = "node-z"

[http]
port = 9000

[[watch]]
path = "notes"
priority = "high"

[[watch]]
path = "boards"
"#,
    )
    .unwrap();

    let config = NodeConfig::load(&path).unwrap();
    assert_eq!(config.sync.max_attempts, 5);
    assert_eq!(config.sync.retry_delay_ms, 1000);
    assert_eq!(config.peer.local_id, "node-z");
    assert_eq!(config.http.address(), "127.0.0.1:9000");
    assert_eq!(config.registry.search_threshold, 0.4);
    assert_eq!(
        config.watch,
        vec![
            WatchedPath {
                path: "notes".to_string(),
                priority: Priority::High,
            },
            WatchedPath {
                path: "boards".to_string(),
                priority: Priority::Normal,
            },
        ]
    );
}

#[test]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trellis.toml");
    std::fs::write(&path, "[sync\nmax_attempts = ").unwrap();
    assert!(NodeConfig::load(&path).is_err());

    std::fs::write(&path, "[sync]\nmax_attempts = \"many\"").unwrap();
    assert!(NodeConfig::load(&path).is_err());
}

// ── Identity ─────────────────────────────────────────────────────

#[test]
fn identity_file_is_generated_then_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.json");

    let first = load_or_generate_identity(&path).unwrap();
    assert!(path.exists());
    let second = load_or_generate_identity(&path).unwrap();
    assert_eq!(first.public(), second.public());
}

#[test]
fn corrupt_identity_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(load_or_generate_identity(&path).is_err());
}
