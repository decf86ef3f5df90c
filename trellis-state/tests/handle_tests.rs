use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use trellis_model::{PrimitiveKind, SchemaDefinition};
use trellis_state::{ChangeSource, ReplicatedState, StateError};
use trellis_store::{GraphStore, MemoryGraphStore, StoreResult, StoreSubscription};

fn schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .field("count", PrimitiveKind::Number)
        .field("name", PrimitiveKind::String)
        .field(
            "profile",
            SchemaDefinition::new().field("email", PrimitiveKind::String),
        )
}

fn setup() -> (Arc<MemoryGraphStore>, ReplicatedState) {
    let store = Arc::new(MemoryGraphStore::new());
    let state = ReplicatedState::new(store.clone(), "apps/demo/counter", schema()).unwrap();
    (store, state)
}

// ── Creation ─────────────────────────────────────────────────────

#[tokio::test]
async fn new_handle_caches_defaults() {
    let (_, state) = setup();
    assert_eq!(
        state.snapshot().await,
        json!({"count": 0, "name": "", "profile": {"email": ""}})
    );
    assert_eq!(state.version().await, 0);
}

#[tokio::test]
async fn seed_is_cast_and_merged_over_defaults() {
    let store = Arc::new(MemoryGraphStore::new());
    let state = ReplicatedState::with_seed(
        store.clone(),
        "apps/demo/counter",
        schema(),
        Some(json!({"count": "7", "extra": true})),
    )
    .unwrap();

    assert_eq!(
        state.snapshot().await,
        json!({"count": 7, "name": "", "profile": {"email": ""}})
    );
    // Seeding does not write.
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn non_object_seed_is_rejected() {
    let store = Arc::new(MemoryGraphStore::new());
    let result = ReplicatedState::with_seed(store, "a/b", schema(), Some(json!([1, 2])));
    assert!(matches!(result, Err(StateError::Validation(_))));
}

#[tokio::test]
async fn invalid_path_is_rejected() {
    let store = Arc::new(MemoryGraphStore::new());
    let result = ReplicatedState::new(store, "", schema());
    assert!(matches!(result, Err(StateError::Store(_))));
}

// ── get ──────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_node_is_empty_object() {
    let (_, state) = setup();
    assert_eq!(state.get().await.unwrap(), json!({}));
}

#[tokio::test]
async fn get_reads_through_and_casts() {
    let (store, state) = setup();
    store
        .inject_remote("apps/demo/counter", json!({"count": true, "unknown": 1}))
        .await
        .unwrap();

    assert_eq!(state.get().await.unwrap(), json!({"count": 1}));
    // The cache is untouched by a plain read.
    assert_eq!(state.version().await, 0);
}

// ── set ──────────────────────────────────────────────────────────

#[tokio::test]
async fn set_writes_through_and_merges_cache() {
    let (store, state) = setup();
    state.set(json!({"name": 42, "extra": "dropped"})).await.unwrap();

    assert_eq!(
        store.get("apps/demo/counter").await.unwrap(),
        Some(json!({"name": "42"}))
    );
    assert_eq!(
        state.snapshot().await,
        json!({"count": 0, "name": "42", "profile": {"email": ""}})
    );
    assert_eq!(state.version().await, 1);
}

#[tokio::test]
async fn set_with_unparseable_number_keeps_cache_valid() {
    let (store, state) = setup();
    state.set(json!({"count": "abc"})).await.unwrap();

    assert_eq!(
        store.get("apps/demo/counter").await.unwrap(),
        Some(json!({"count": 0}))
    );
    assert!(schema().validate(&state.snapshot().await));
}

#[tokio::test]
async fn set_emits_old_and_new_state() {
    let (_, state) = setup();
    let mut changes = state.subscribe();

    state.set(json!({"count": 3})).await.unwrap();

    let change = changes.recv().await.unwrap();
    assert_eq!(change.path, "apps/demo/counter");
    assert_eq!(change.source, ChangeSource::Local);
    assert_eq!(change.old_state["count"], json!(0));
    assert_eq!(change.new_state["count"], json!(3));
    assert_eq!(change.version, 1);
}

#[tokio::test]
async fn dropped_subscriber_does_not_block_writes() {
    let (_, state) = setup();
    drop(state.subscribe());
    state.set(json!({"count": 1})).await.unwrap();
}

// ── update / transaction ─────────────────────────────────────────

#[tokio::test]
async fn update_reads_current_value() {
    let (_, state) = setup();
    state.set(json!({"count": 2})).await.unwrap();

    state
        .update(|current| json!({"count": current["count"].as_i64().unwrap() + 1}))
        .await
        .unwrap();

    assert_eq!(state.get().await.unwrap()["count"], json!(3));
}

#[tokio::test]
async fn transaction_behaves_like_update() {
    let (_, state) = setup();
    state
        .transaction(|current| {
            assert_eq!(current, json!({}));
            json!({"name": "first"})
        })
        .await
        .unwrap();
    assert_eq!(state.get().await.unwrap(), json!({"name": "first"}));
}

/// Holds every read until two readers have arrived, so both observe the
/// same snapshot before either writes.
struct LockstepStore {
    inner: MemoryGraphStore,
    barrier: Barrier,
}

#[async_trait]
impl GraphStore for LockstepStore {
    async fn put(&self, path: &str, value: Value) -> StoreResult<()> {
        self.inner.put(path, value).await
    }

    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let value = self.inner.get(path).await;
        self.barrier.wait().await;
        value
    }

    fn subscribe(&self, path: &str) -> StoreSubscription {
        self.inner.subscribe(path)
    }

    async fn scan(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        self.inner.scan(prefix).await
    }
}

#[tokio::test]
async fn concurrent_updates_lose_a_write() {
    let store = Arc::new(LockstepStore {
        inner: MemoryGraphStore::new(),
        barrier: Barrier::new(2),
    });
    let a = ReplicatedState::new(store.clone(), "apps/demo/counter", schema()).unwrap();
    let b = ReplicatedState::new(store.clone(), "apps/demo/counter", schema()).unwrap();

    let increment = |current: Value| {
        json!({"count": current["count"].as_i64().unwrap_or(0) + 1})
    };
    let (ra, rb) = tokio::join!(a.update(increment), b.update(increment));
    ra.unwrap();
    rb.unwrap();

    // Both read 0, both wrote 1.
    assert_eq!(store.inner.get("apps/demo/counter").await.unwrap(), Some(json!({"count": 1})));
}

#[tokio::test]
async fn set_if_version_detects_interleaved_write() {
    let (_, state) = setup();
    let other = state.clone();

    let seen = state.version().await;
    other.set(json!({"count": 10})).await.unwrap();

    let err = state
        .set_if_version(seen, json!({"count": 1}))
        .await
        .unwrap_err();
    match err {
        StateError::VersionConflict { expected, actual } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.snapshot().await["count"], json!(10));

    state
        .set_if_version(1, json!({"count": 11}))
        .await
        .unwrap();
    assert_eq!(state.snapshot().await["count"], json!(11));
    assert_eq!(state.version().await, 2);
}

// ── refresh / apply_remote ───────────────────────────────────────

#[tokio::test]
async fn refresh_replaces_cache_over_defaults() {
    let (store, state) = setup();
    state.apply_remote(&json!({"name": "stale"})).await;
    store
        .inject_remote("apps/demo/counter", json!({"count": 5}))
        .await
        .unwrap();
    let mut changes = state.subscribe();

    state.refresh().await.unwrap();

    assert_eq!(
        state.snapshot().await,
        json!({"count": 5, "name": "", "profile": {"email": ""}})
    );
    let change = changes.recv().await.unwrap();
    assert_eq!(change.source, ChangeSource::Refresh);
    assert_eq!(change.old_state["name"], json!("stale"));
}

#[tokio::test]
async fn refresh_of_missing_node_yields_defaults() {
    let (_, state) = setup();
    state.apply_remote(&json!({"count": 9})).await;

    state.refresh().await.unwrap();

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot, schema().default_value());
    assert!(schema().validate(&snapshot));
}

#[tokio::test]
async fn refresh_fills_partial_nested_node() {
    let (store, state) = setup();
    store
        .inject_remote("apps/demo/counter", json!({"profile": {}, "count": "x"}))
        .await
        .unwrap();

    state.refresh().await.unwrap();

    let snapshot = state.snapshot().await;
    assert_eq!(
        snapshot,
        json!({"count": 0, "name": "", "profile": {"email": ""}})
    );
    assert!(schema().validate(&snapshot));
}

#[tokio::test]
async fn apply_remote_merges_without_writing() {
    let (store, state) = setup();
    let mut changes = state.subscribe();

    state.apply_remote(&json!({"name": "remote", "junk": 1})).await;

    assert_eq!(state.snapshot().await["name"], json!("remote"));
    assert!(state.snapshot().await.get("junk").is_none());
    assert!(store.is_empty().await);
    assert_eq!(changes.recv().await.unwrap().source, ChangeSource::Remote);
}

#[tokio::test]
async fn snapshot_as_typed_value() {
    #[derive(Deserialize)]
    struct Counter {
        count: f64,
        name: String,
    }

    let (_, state) = setup();
    state.set(json!({"count": 4, "name": "n"})).await.unwrap();

    let counter: Counter = state.snapshot_as().await.unwrap();
    assert_eq!(counter.count, 4.0);
    assert_eq!(counter.name, "n");
}

// ── watch ────────────────────────────────────────────────────────

#[tokio::test]
async fn watch_applies_remote_changes() {
    let (store, state) = setup();
    let mut changes = state.subscribe();
    let _guard = state.watch();

    store
        .inject_remote("apps/demo/counter", json!({"count": 9}))
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(1), changes.recv())
        .await
        .expect("no change observed")
        .unwrap();
    assert_eq!(change.source, ChangeSource::Remote);
    assert_eq!(change.new_state["count"], json!(9));
}

#[tokio::test]
async fn watch_ignores_local_writes_and_children() {
    let (store, state) = setup();
    let mut changes = state.subscribe();
    let _guard = state.watch();

    state.set(json!({"count": 1})).await.unwrap();
    store
        .inject_remote("apps/demo/counter/child", json!({"count": 1}))
        .await
        .unwrap();

    // Only the local set produced a change.
    assert_eq!(changes.recv().await.unwrap().source, ChangeSource::Local);
    let more = tokio::time::timeout(Duration::from_millis(100), changes.recv()).await;
    assert!(more.is_err());
}

#[tokio::test]
async fn dropping_watch_guard_stops_forwarding() {
    let (store, state) = setup();
    let guard = state.watch();
    drop(guard);
    tokio::task::yield_now().await;

    store
        .inject_remote("apps/demo/counter", json!({"count": 9}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(state.version().await, 0);
}
