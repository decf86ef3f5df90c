//! Sync engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Reconciliation attempts per dequeued path before giving up.
    pub max_attempts: u32,
    /// Delay between attempts (ms).
    pub retry_delay_ms: u64,
    /// Timeout for one store read (ms).
    pub fetch_timeout_ms: u64,
    /// Start draining the queue as soon as something is enqueued.
    pub auto_drain: bool,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
            fetch_timeout_ms: 30_000,
            auto_drain: true,
            event_capacity: 256,
        }
    }
}

impl SyncConfig {
    /// Delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Timeout for one store read.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
