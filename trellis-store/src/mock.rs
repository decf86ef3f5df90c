//! A fault-injecting store for testing.

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryGraphStore;
use crate::{GraphStore, StoreSubscription};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// How reads of a path should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Every read fails.
    Always,
    /// The next `n` reads fail, then reads succeed again.
    Times(usize),
}

/// Wraps a [`MemoryGraphStore`], failing or delaying reads on demand and
/// recording every read it serves.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryGraphStore,
    failures: Mutex<HashMap<String, Failure>>,
    delays: Mutex<HashMap<String, Duration>>,
    reads: Mutex<Vec<String>>,
}

impl FaultyStore {
    /// Creates an empty faulty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store (for seeding data or injecting remote writes).
    pub fn inner(&self) -> &MemoryGraphStore {
        &self.inner
    }

    /// Makes reads of `path` fail.
    pub fn fail_reads(&self, path: &str, failure: Failure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), failure);
    }

    /// Delays every read of `path`.
    pub fn delay_reads(&self, path: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), delay);
    }

    /// Clears failures and delays for `path`.
    pub fn heal(&self, path: &str) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).remove(path);
        self.delays.lock().unwrap_or_else(PoisonError::into_inner).remove(path);
    }

    /// Every path read so far, in order (including failed reads).
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of reads of `path` so far.
    pub fn read_count(&self, path: &str) -> usize {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| *p == path)
            .count()
    }

    fn take_failure(&self, path: &str) -> bool {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(path) {
            Some(Failure::Always) => true,
            Some(Failure::Times(n)) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl GraphStore for FaultyStore {
    async fn put(&self, path: &str, value: Value) -> StoreResult<()> {
        self.inner.put(path, value).await
    }

    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        self.reads.lock().unwrap_or_else(PoisonError::into_inner).push(path.to_string());
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_failure(path) {
            return Err(StoreError::Unavailable(format!("injected read failure for {path}")));
        }
        self.inner.get(path).await
    }

    fn subscribe(&self, path: &str) -> StoreSubscription {
        self.inner.subscribe(path)
    }

    async fn scan(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        self.inner.scan(prefix).await
    }
}
