//! The reconciliation queue.
//!
//! Three FIFO classes drained strictly in priority order. A path appears
//! at most once; enqueueing a queued path moves it to the back of its
//! (possibly new) class.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Reconciliation priority for a watched path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// All priorities, highest first.
    pub const DESCENDING: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    fn slot(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        })
    }
}

/// One queued path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    pub path: String,
    pub priority: Priority,
}

/// Priority queue of paths awaiting reconciliation.
#[derive(Debug, Default)]
pub struct SyncQueue {
    classes: [VecDeque<String>; 3],
}

impl SyncQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `path` at the back of `priority`, removing any existing
    /// entry for it first.
    pub fn push(&mut self, path: &str, priority: Priority) {
        self.remove(path);
        self.classes[priority.slot()].push_back(path.to_string());
    }

    /// Removes and returns the highest-priority, oldest entry.
    pub fn pop(&mut self) -> Option<SyncQueueEntry> {
        Priority::DESCENDING.into_iter().find_map(|priority| {
            self.classes[priority.slot()]
                .pop_front()
                .map(|path| SyncQueueEntry { path, priority })
        })
    }

    /// Removes `path`. Returns whether it was queued.
    pub fn remove(&mut self, path: &str) -> bool {
        for class in &mut self.classes {
            if let Some(index) = class.iter().position(|p| p == path) {
                class.remove(index);
                return true;
            }
        }
        false
    }

    /// The priority `path` is queued at, if queued.
    pub fn priority_of(&self, path: &str) -> Option<Priority> {
        Priority::DESCENDING
            .into_iter()
            .find(|priority| self.classes[priority.slot()].iter().any(|p| p == path))
    }

    /// Whether `path` is queued.
    pub fn contains(&self, path: &str) -> bool {
        self.priority_of(path).is_some()
    }

    /// Number of queued paths.
    pub fn len(&self) -> usize {
        self.classes.iter().map(VecDeque::len).sum()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(VecDeque::is_empty)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        for class in &mut self.classes {
            class.clear();
        }
    }

    /// Entries in the order they would be popped.
    pub fn entries(&self) -> Vec<SyncQueueEntry> {
        Priority::DESCENDING
            .into_iter()
            .flat_map(|priority| {
                self.classes[priority.slot()]
                    .iter()
                    .map(move |path| SyncQueueEntry {
                        path: path.clone(),
                        priority,
                    })
            })
            .collect()
    }
}
