//! Per-path status and engine events.

use crate::queue::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synchronization status of one watched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// When the path last reconciled successfully.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Remote updates observed since the last successful reconciliation.
    pub pending_changes: u64,
    /// Queue priority.
    pub priority: Priority,
    /// Whether remote updates are currently being dropped.
    pub is_paused: bool,
}

impl SyncStatus {
    /// A fresh status at `priority`.
    pub fn new(priority: Priority) -> Self {
        Self {
            last_sync_time: None,
            pending_changes: 0,
            priority,
            is_paused: false,
        }
    }
}

/// Something the engine did, published on its event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A path started synchronizing.
    Started { path: String, priority: Priority },
    /// A path stopped synchronizing.
    Stopped { path: String },
    /// Remote updates for a path are now dropped.
    Paused { path: String },
    /// Remote updates for a path are counted again.
    Resumed { path: String },
    /// A remote update was observed and the path queued.
    RemoteUpdate { path: String, pending_changes: u64 },
    /// A path was fetched and applied.
    Reconciled { path: String, at: DateTime<Utc> },
    /// One reconciliation attempt failed.
    AttemptFailed {
        path: String,
        attempt: u32,
        error: String,
    },
    /// Every attempt for a dequeued path failed.
    RetryExhausted {
        path: String,
        attempts: u32,
        error: String,
    },
}

impl SyncEvent {
    /// The path the event concerns.
    pub fn path(&self) -> &str {
        match self {
            SyncEvent::Started { path, .. }
            | SyncEvent::Stopped { path }
            | SyncEvent::Paused { path }
            | SyncEvent::Resumed { path }
            | SyncEvent::RemoteUpdate { path, .. }
            | SyncEvent::Reconciled { path, .. }
            | SyncEvent::AttemptFailed { path, .. }
            | SyncEvent::RetryExhausted { path, .. } => path,
        }
    }
}
