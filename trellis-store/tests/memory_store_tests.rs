use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use trellis_store::mock::{FaultyStore, Failure};
use trellis_store::{GraphStore, MemoryGraphStore, StoreError, UpdateOrigin};

// ── put / get ────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_is_none() {
    let store = MemoryGraphStore::new();
    assert!(store.get("todos/1").await.unwrap().is_none());
}

#[tokio::test]
async fn put_then_get() {
    let store = MemoryGraphStore::new();
    store.put("todos/1", json!({"title": "milk"})).await.unwrap();
    assert_eq!(store.get("todos/1").await.unwrap(), Some(json!({"title": "milk"})));
}

#[tokio::test]
async fn object_puts_merge_fields() {
    let store = MemoryGraphStore::new();
    store.put("todos/1", json!({"title": "milk", "done": false})).await.unwrap();
    store.put("todos/1", json!({"done": true})).await.unwrap();
    assert_eq!(
        store.get("todos/1").await.unwrap(),
        Some(json!({"title": "milk", "done": true}))
    );
}

#[tokio::test]
async fn scalar_put_replaces_node() {
    let store = MemoryGraphStore::new();
    store.put("counter", json!({"n": 1})).await.unwrap();
    store.put("counter", json!(7)).await.unwrap();
    assert_eq!(store.get("counter").await.unwrap(), Some(json!(7)));
}

#[tokio::test]
async fn null_tombstones_node() {
    let store = MemoryGraphStore::new();
    store.put("todos/1", json!({"title": "milk"})).await.unwrap();
    store.put("todos/1", json!(null)).await.unwrap();
    assert!(store.get("todos/1").await.unwrap().is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn invalid_path_rejected() {
    let store = MemoryGraphStore::new();
    let err = store.put("a//b", json!({})).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPath(_)));
}

// ── scan ─────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_lists_descendants_only() {
    let store = MemoryGraphStore::new();
    store.put("components/public/a/x/1", json!({"v": 1})).await.unwrap();
    store.put("components/public/b/y/2", json!({"v": 2})).await.unwrap();
    store.put("components/private/a/x/1", json!({"v": 3})).await.unwrap();
    store.put("components/publicity", json!({"v": 4})).await.unwrap();

    let found = store.scan("components/public").await.unwrap();
    let paths: Vec<_> = found.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["components/public/a/x/1", "components/public/b/y/2"]);
}

// ── subscribe ────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_sees_own_and_descendant_changes() {
    let store = MemoryGraphStore::new();
    let mut sub = store.subscribe("todos");

    store.put("other", json!({"x": 1})).await.unwrap();
    store.put("todos/1", json!({"title": "milk"})).await.unwrap();

    let update = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.path, "todos/1");
    assert_eq!(update.origin, UpdateOrigin::Local);
    assert_eq!(update.value, Some(json!({"title": "milk"})));
}

#[tokio::test]
async fn injected_writes_are_remote() {
    let store = MemoryGraphStore::new();
    let mut sub = store.subscribe("todos/1");
    store.inject_remote("todos/1", json!({"done": true})).await.unwrap();

    let update = sub.recv().await.unwrap();
    assert_eq!(update.origin, UpdateOrigin::Remote);
}

#[tokio::test]
async fn tombstone_update_carries_none() {
    let store = MemoryGraphStore::new();
    store.put("todos/1", json!({"title": "milk"})).await.unwrap();
    let mut sub = store.subscribe("todos/1");
    store.put("todos/1", json!(null)).await.unwrap();
    assert_eq!(sub.recv().await.unwrap().value, None);
}

// ── FaultyStore ──────────────────────────────────────────────────

#[tokio::test]
async fn faulty_store_fails_n_times_then_recovers() {
    let store = FaultyStore::new();
    store.put("p", json!({"a": 1})).await.unwrap();
    store.fail_reads("p", Failure::Times(2));

    assert!(store.get("p").await.is_err());
    assert!(store.get("p").await.is_err());
    assert_eq!(store.get("p").await.unwrap(), Some(json!({"a": 1})));
    assert_eq!(store.read_count("p"), 3);
}

#[tokio::test]
async fn faulty_store_heal_clears_failure() {
    let store = FaultyStore::new();
    store.fail_reads("p", Failure::Always);
    assert!(store.get("p").await.is_err());
    store.heal("p");
    assert!(store.get("p").await.unwrap().is_none());
}
