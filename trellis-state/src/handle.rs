//! The replicated state handle.

use crate::error::{StateError, StateResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use trellis_model::{merge, SchemaDefinition, ValidationError};
use trellis_store::{validate_path, GraphStore, UpdateOrigin};

/// Default capacity of a handle's change channel.
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// Where a cache change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// `set`, `update` or `transaction` on this handle.
    Local,
    /// A value observed from another replica.
    Remote,
    /// A read-through `refresh`.
    Refresh,
}

/// Emitted to subscribers whenever the cached value changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Path of the state object.
    pub path: String,
    /// Cached value after the change.
    pub new_state: Value,
    /// Cached value before the change.
    pub old_state: Value,
    /// What caused the change.
    pub source: ChangeSource,
    /// Local version after the change.
    pub version: u64,
}

#[derive(Debug)]
struct Cached {
    value: Value,
    version: u64,
}

struct Inner {
    path: String,
    schema: SchemaDefinition,
    store: Arc<dyn GraphStore>,
    cache: RwLock<Cached>,
    changes: broadcast::Sender<StateChange>,
}

/// A typed view of one replicated object in the graph store.
///
/// Handles are cheap to clone; clones share the cache and the change
/// channel. The cached value always has the schema's shape: every write
/// and every remote observation is cast before it is merged in.
///
/// `update` and `transaction` are read-modify-write sequences, not atomic:
/// two concurrent updates on the same path both read the same snapshot and
/// the last write wins. Use [`ReplicatedState::set_if_version`] to detect
/// that race locally.
#[derive(Clone)]
pub struct ReplicatedState {
    inner: Arc<Inner>,
}

impl ReplicatedState {
    /// Creates a handle for `path`. The cache starts at the schema defaults.
    pub fn new(
        store: Arc<dyn GraphStore>,
        path: impl Into<String>,
        schema: SchemaDefinition,
    ) -> StateResult<Self> {
        Self::with_seed(store, path, schema, None)
    }

    /// Creates a handle whose cache is the schema defaults with `seed`
    /// merged over them. The seed is cast but not written to the store.
    pub fn with_seed(
        store: Arc<dyn GraphStore>,
        path: impl Into<String>,
        schema: SchemaDefinition,
        seed: Option<Value>,
    ) -> StateResult<Self> {
        let path = path.into();
        validate_path(&path)?;

        let defaults = schema.default_value();
        let value = match seed {
            None => defaults,
            Some(seed @ Value::Object(_)) => merge(&defaults, &schema.cast(&seed)),
            Some(other) => {
                return Err(ValidationError::NotAnObject {
                    found: describe(&other).to_string(),
                }
                .into());
            }
        };

        let (changes, _) = broadcast::channel(DEFAULT_CHANGE_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                schema,
                store,
                cache: RwLock::new(Cached { value, version: 0 }),
                changes,
            }),
        })
    }

    /// The store path of this object.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The schema values are cast through.
    pub fn schema(&self) -> &SchemaDefinition {
        &self.inner.schema
    }

    /// Reads the current value through the store and casts it.
    ///
    /// Does not consult or touch the cache. A missing node reads as `{}`.
    pub async fn get(&self) -> StateResult<Value> {
        match self.inner.store.get(&self.inner.path).await? {
            Some(value) => Ok(self.inner.schema.cast(&value)),
            None => Ok(json!({})),
        }
    }

    /// Casts `partial`, writes it through the store and merges it into the
    /// cache. Returns once the store has accepted the write.
    pub async fn set(&self, partial: Value) -> StateResult<()> {
        let cast = self.inner.schema.cast(&partial);
        self.inner.store.put(&self.inner.path, cast.clone()).await?;
        self.apply(ChangeSource::Local, |old| merge(old, &cast)).await;
        Ok(())
    }

    /// Like [`set`](Self::set), but fails with
    /// [`StateError::VersionConflict`] if the local version is no longer
    /// `expected`. The version check and the write are one step with
    /// respect to other writers on this handle.
    pub async fn set_if_version(&self, expected: u64, partial: Value) -> StateResult<()> {
        let cast = self.inner.schema.cast(&partial);

        let mut cache = self.inner.cache.write().await;
        if cache.version != expected {
            debug!(
                "Rejected write to {}: version {} != {}",
                self.inner.path, cache.version, expected
            );
            return Err(StateError::VersionConflict {
                expected,
                actual: cache.version,
            });
        }
        self.inner.store.put(&self.inner.path, cast.clone()).await?;

        let new_state = merge(&cache.value, &cast);
        let change = commit(&self.inner.path, &mut cache, new_state, ChangeSource::Local);
        drop(cache);
        let _ = self.inner.changes.send(change);
        Ok(())
    }

    /// Reads the current value, passes it to `f` and writes the result.
    ///
    /// Not atomic: a concurrent writer between the read and the write is
    /// overwritten.
    pub async fn update<F>(&self, f: F) -> StateResult<()>
    where
        F: FnOnce(Value) -> Value + Send,
    {
        let current = self.get().await?;
        self.set(f(current)).await
    }

    /// Same as [`update`](Self::update). Offers no isolation.
    pub async fn transaction<F>(&self, f: F) -> StateResult<()>
    where
        F: FnOnce(Value) -> Value + Send,
    {
        self.update(f).await
    }

    /// Re-reads the store and replaces the cache with the result laid over
    /// the schema defaults. Fields missing from the store read as defaults.
    pub async fn refresh(&self) -> StateResult<()> {
        let fetched = self.get().await?;
        let value = merge(&self.inner.schema.default_value(), &fetched);
        self.apply(ChangeSource::Refresh, |_| value).await;
        Ok(())
    }

    /// Casts a value observed from another replica and merges it into the
    /// cache. Nothing is written to the store.
    pub async fn apply_remote(&self, value: &Value) {
        let cast = self.inner.schema.cast(value);
        self.apply(ChangeSource::Remote, |old| merge(old, &cast)).await;
    }

    /// Subscribes to cache changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.changes.subscribe()
    }

    /// The cached value.
    pub async fn snapshot(&self) -> Value {
        self.inner.cache.read().await.value.clone()
    }

    /// The cached value deserialized into `T`.
    pub async fn snapshot_as<T: DeserializeOwned>(&self) -> StateResult<T> {
        Ok(serde_json::from_value(self.snapshot().await)?)
    }

    /// Number of cache changes since creation.
    pub async fn version(&self) -> u64 {
        self.inner.cache.read().await.version
    }

    /// Forwards remote changes to this path from the store feed into
    /// [`apply_remote`](Self::apply_remote) until the guard is dropped.
    ///
    /// Local writes are already in the cache and are not applied twice.
    pub fn watch(&self) -> WatchGuard {
        let mut subscription = self.inner.store.subscribe(&self.inner.path);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            while let Some(update) = subscription.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                if update.origin != UpdateOrigin::Remote || update.path != inner.path {
                    continue;
                }
                let handle = ReplicatedState { inner };
                match update.value {
                    Some(value) => handle.apply_remote(&value).await,
                    None => warn!("State at {} was removed remotely", handle.path()),
                }
            }
        });

        WatchGuard { task }
    }

    async fn apply<F>(&self, source: ChangeSource, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let change = {
            let mut cache = self.inner.cache.write().await;
            let new_state = f(&cache.value);
            commit(&self.inner.path, &mut cache, new_state, source)
        };
        debug!("State {} changed ({:?}, v{})", change.path, source, change.version);
        // No subscribers is not an error.
        let _ = self.inner.changes.send(change);
    }
}

impl std::fmt::Debug for ReplicatedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedState")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

/// Stops a [`ReplicatedState::watch`] forwarder when dropped.
#[derive(Debug)]
pub struct WatchGuard {
    task: JoinHandle<()>,
}

impl WatchGuard {
    /// Returns true once the forwarder has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn commit(path: &str, cache: &mut Cached, new_state: Value, source: ChangeSource) -> StateChange {
    let old_state = std::mem::replace(&mut cache.value, new_state.clone());
    cache.version += 1;
    StateChange {
        path: path.to_string(),
        new_state,
        old_state,
        source,
        version: cache.version,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
