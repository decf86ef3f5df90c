//! The sync engine.
//!
//! Watches store paths, counts remote updates, and reconciles queued paths
//! one at a time. Each path moves through
//!
//! ```text
//! Idle ─start_sync─▶ Watching ─remote update─▶ PendingReconciliation
//!                       ▲                              │ drain
//!                       └────── success / give up ◀── Reconciling
//! ```
//!
//! Failures are retried and then reported as events; they never reach the
//! code that caused the update.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::queue::{Priority, SyncQueue, SyncQueueEntry};
use crate::status::{SyncEvent, SyncStatus};
use crate::target::SyncTarget;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_peer::{Messenger, PeerDirectory};
use trellis_store::{validate_path, GraphStore, UpdateOrigin};

/// Peer message topic carrying "this path changed" hints.
pub const HINT_TOPIC: &str = "sync.hint";

#[derive(Default)]
struct EngineState {
    statuses: HashMap<String, SyncStatus>,
    queue: SyncQueue,
    listeners: HashMap<String, JoinHandle<()>>,
    bindings: HashMap<String, Arc<dyn SyncTarget>>,
    hint_listener: Option<JoinHandle<()>>,
}

impl EngineState {
    fn abort_tasks(&mut self) {
        for (_, listener) in self.listeners.drain() {
            listener.abort();
        }
        if let Some(hints) = self.hint_listener.take() {
            hints.abort();
        }
    }
}

struct EngineInner {
    config: SyncConfig,
    store: Arc<dyn GraphStore>,
    messenger: Option<Arc<dyn Messenger>>,
    state: Mutex<EngineState>,
    /// Held for the whole of each reconciliation attempt.
    reconcile_lock: Mutex<()>,
    draining: AtomicBool,
    stopped: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

/// Outcome of one reconciliation attempt that did not fail.
enum Attempt {
    Applied,
    /// The path stopped syncing while the fetch was in flight.
    Discarded,
}

/// Schedules and reconciles replicated paths.
///
/// Cheap to clone; clones drive the same engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Creates an engine over `store` without peer messaging.
    pub fn new(store: Arc<dyn GraphStore>, config: SyncConfig) -> Self {
        Self::build(store, config, None)
    }

    /// Creates an engine that can announce changes to peers.
    pub fn with_messenger(
        store: Arc<dyn GraphStore>,
        config: SyncConfig,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self::build(store, config, Some(messenger))
    }

    fn build(
        store: Arc<dyn GraphStore>,
        config: SyncConfig,
        messenger: Option<Arc<dyn Messenger>>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                messenger,
                state: Mutex::new(EngineState::default()),
                reconcile_lock: Mutex::new(()),
                draining: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Subscribes to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }

    fn ensure_running(&self) -> SyncResult<()> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(SyncError::Stopped);
        }
        Ok(())
    }

    // ── Watching ─────────────────────────────────────────────────

    /// Starts synchronizing `path`: creates its status, queues an initial
    /// reconciliation, and listens for remote changes to it.
    pub async fn start_sync(&self, path: &str, priority: Priority) -> SyncResult<()> {
        self.ensure_running()?;
        validate_path(path)?;

        {
            let mut state = self.inner.state.lock().await;
            if state.statuses.contains_key(path) {
                warn!("Already watching {}", path);
                return Err(SyncError::AlreadyWatching(path.to_string()));
            }
            state
                .statuses
                .insert(path.to_string(), SyncStatus::new(priority));
            state.queue.push(path, priority);
            let listener = self.spawn_listener(path);
            state.listeners.insert(path.to_string(), listener);
        }

        info!("Started syncing {} at {} priority", path, priority);
        self.emit(SyncEvent::Started {
            path: path.to_string(),
            priority,
        });
        self.kick();
        Ok(())
    }

    fn spawn_listener(&self, path: &str) -> JoinHandle<()> {
        let mut subscription = self.inner.store.subscribe(path);
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let path = path.to_string();

        tokio::spawn(async move {
            while let Some(update) = subscription.recv().await {
                if update.origin != UpdateOrigin::Remote {
                    continue;
                }
                let Some(inner) = weak.upgrade() else { break };
                SyncEngine { inner }.notify_remote_update(&path).await;
            }
        })
    }

    /// Records a remote update for `path` and queues it.
    ///
    /// Returns false when the update was ignored: the path is not watched
    /// or is paused.
    pub async fn notify_remote_update(&self, path: &str) -> bool {
        let pending_changes = {
            let mut state = self.inner.state.lock().await;
            let Some(status) = state.statuses.get_mut(path) else {
                debug!("Ignoring update for unwatched path {}", path);
                return false;
            };
            if status.is_paused {
                debug!("Dropping update for paused path {}", path);
                return false;
            }
            status.pending_changes += 1;
            let (priority, pending) = (status.priority, status.pending_changes);
            state.queue.push(path, priority);
            pending
        };

        self.emit(SyncEvent::RemoteUpdate {
            path: path.to_string(),
            pending_changes,
        });
        self.kick();
        true
    }

    /// Stops synchronizing `path` and unbinds its state handle.
    ///
    /// A fetch already in flight for the path completes but its result is
    /// discarded.
    pub async fn stop_sync(&self, path: &str) -> SyncResult<()> {
        {
            let mut state = self.inner.state.lock().await;
            if state.statuses.remove(path).is_none() {
                return Err(SyncError::NotWatching(path.to_string()));
            }
            if let Some(listener) = state.listeners.remove(path) {
                listener.abort();
            }
            state.queue.remove(path);
            state.bindings.remove(path);
        }

        info!("Stopped syncing {}", path);
        self.emit(SyncEvent::Stopped {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Changes the priority of a watched path, moving a queued entry to the
    /// back of its new class.
    pub async fn set_priority(&self, path: &str, priority: Priority) -> SyncResult<()> {
        let mut state = self.inner.state.lock().await;
        let status = state
            .statuses
            .get_mut(path)
            .ok_or_else(|| SyncError::NotWatching(path.to_string()))?;
        status.priority = priority;
        if state.queue.contains(path) {
            state.queue.push(path, priority);
        }
        debug!("Priority of {} set to {}", path, priority);
        Ok(())
    }

    /// Binds a target that receives reconciled values for its path.
    pub async fn bind_state<T: SyncTarget + 'static>(&self, target: T) -> SyncResult<()> {
        let path = target.path().to_string();
        let mut state = self.inner.state.lock().await;
        if state.bindings.contains_key(&path) {
            return Err(SyncError::AlreadyRegistered(path));
        }
        debug!("Bound state handle for {}", path);
        state.bindings.insert(path, Arc::new(target));
        Ok(())
    }

    /// Removes the target bound to `path`. Returns whether one was bound.
    pub async fn unbind_state(&self, path: &str) -> bool {
        self.inner.state.lock().await.bindings.remove(path).is_some()
    }

    /// Drops remote updates for `path` until resumed.
    pub async fn pause_sync(&self, path: &str) -> SyncResult<()> {
        self.set_paused(path, true).await?;
        info!("Paused syncing {}", path);
        self.emit(SyncEvent::Paused {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Counts remote updates for `path` again. Updates dropped while paused
    /// are not replayed; call [`force_sync`](Self::force_sync) to catch up.
    pub async fn resume_sync(&self, path: &str) -> SyncResult<()> {
        self.set_paused(path, false).await?;
        info!("Resumed syncing {}", path);
        self.emit(SyncEvent::Resumed {
            path: path.to_string(),
        });
        Ok(())
    }

    async fn set_paused(&self, path: &str, paused: bool) -> SyncResult<()> {
        let mut state = self.inner.state.lock().await;
        let status = state
            .statuses
            .get_mut(path)
            .ok_or_else(|| SyncError::NotWatching(path.to_string()))?;
        status.is_paused = paused;
        Ok(())
    }

    // ── Reconciliation ───────────────────────────────────────────

    fn kick(&self) {
        if !self.inner.config.auto_drain {
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move { engine.drain().await });
    }

    /// Reconciles queued paths until the queue is empty.
    ///
    /// Returns immediately if another drain is running; that drain will
    /// pick up anything queued before it finishes.
    pub async fn drain(&self) {
        loop {
            if self
                .inner
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            while let Some(entry) = self.next_entry().await {
                self.reconcile_with_retry(&entry.path).await;
            }

            self.inner.draining.store(false, Ordering::Release);

            // An entry queued between our last pop and the release above
            // would otherwise wait for the next notification.
            if self.inner.stopped.load(Ordering::Acquire)
                || self.inner.state.lock().await.queue.is_empty()
            {
                return;
            }
        }
    }

    async fn next_entry(&self) -> Option<SyncQueueEntry> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return None;
        }
        self.inner.state.lock().await.queue.pop()
    }

    async fn reconcile_with_retry(&self, path: &str) {
        let max_attempts = self.inner.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.reconcile_exclusive(path).await {
                Ok(_) => return,
                Err(e) => {
                    warn!(
                        "Reconciling {} failed (attempt {}/{}): {}",
                        path, attempt, max_attempts, e
                    );
                    last_error = e.to_string();
                    self.emit(SyncEvent::AttemptFailed {
                        path: path.to_string(),
                        attempt,
                        error: last_error.clone(),
                    });
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.inner.config.retry_delay()).await;
                if !self.is_watching(path).await {
                    debug!("{} stopped during retry, abandoning", path);
                    return;
                }
            }
        }

        warn!("Giving up on {} after {} attempts", path, max_attempts);
        self.emit(SyncEvent::RetryExhausted {
            path: path.to_string(),
            attempts: max_attempts,
            error: last_error,
        });
    }

    async fn reconcile_exclusive(&self, path: &str) -> SyncResult<Attempt> {
        let _guard = self.inner.reconcile_lock.lock().await;
        self.reconcile_once(path).await
    }

    async fn reconcile_once(&self, path: &str) -> SyncResult<Attempt> {
        let observed = {
            let state = self.inner.state.lock().await;
            match state.statuses.get(path) {
                Some(status) => status.pending_changes,
                None => return Ok(Attempt::Discarded),
            }
        };

        let timeout = self.inner.config.fetch_timeout();
        let fetched = tokio::time::timeout(timeout, self.inner.store.get(path))
            .await
            .map_err(|_| SyncError::Timeout {
                path: path.to_string(),
                after_ms: self.inner.config.fetch_timeout_ms,
            })?
            .map_err(|source| SyncError::Fetch {
                path: path.to_string(),
                source,
            })?;

        let target = {
            let state = self.inner.state.lock().await;
            if !state.statuses.contains_key(path) {
                debug!("Discarding fetched value for stopped path {}", path);
                return Ok(Attempt::Discarded);
            }
            state.bindings.get(path).cloned()
        };

        if let (Some(target), Some(value)) = (target, fetched.as_ref()) {
            target.apply(value).await?;
        }

        let at = Utc::now();
        {
            let mut state = self.inner.state.lock().await;
            let Some(status) = state.statuses.get_mut(path) else {
                return Ok(Attempt::Discarded);
            };
            // Changes noted after the fetch started stay pending.
            status.pending_changes = status.pending_changes.saturating_sub(observed);
            status.last_sync_time = Some(at);
        }

        debug!("Reconciled {}", path);
        self.emit(SyncEvent::Reconciled {
            path: path.to_string(),
            at,
        });
        Ok(Attempt::Applied)
    }

    /// Reconciles `path` once, now, outside the queue. Waits for any
    /// reconciliation already in flight. Errors are returned rather than
    /// retried.
    pub async fn force_sync(&self, path: &str) -> SyncResult<()> {
        self.ensure_running()?;
        if !self.is_watching(path).await {
            return Err(SyncError::NotWatching(path.to_string()));
        }
        self.reconcile_exclusive(path).await.map(|_| ())
    }

    /// Force-syncs every watched path, returning the first error after all
    /// of them have been tried.
    pub async fn force_sync_all(&self) -> SyncResult<()> {
        let mut first_error = None;
        for path in self.watched_paths().await {
            if let Err(e) = self.force_sync(&path).await {
                warn!("Force sync of {} failed: {}", path, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stops every path and refuses further work. Safe to call repeatedly.
    pub async fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        let paths: Vec<String> = {
            let mut state = self.inner.state.lock().await;
            state.abort_tasks();
            state.queue.clear();
            state.bindings.clear();
            state.statuses.drain().map(|(path, _)| path).collect()
        };

        for path in paths {
            self.emit(SyncEvent::Stopped { path });
        }
        info!("Sync engine stopped");
    }

    // ── Peer hints ───────────────────────────────────────────────

    /// Treats `sync.hint` messages from peers as remote updates for the
    /// path in their payload. Replaces any previous hint listener.
    pub async fn listen_for_peer_hints(&self, directory: &PeerDirectory) -> SyncResult<()> {
        self.ensure_running()?;
        let mut inbox = directory.inbox();
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                if message.topic != HINT_TOPIC {
                    continue;
                }
                let Some(path) = message.payload_str() else {
                    warn!("Ignoring non-UTF-8 sync hint from {}", message.from);
                    continue;
                };
                let Some(inner) = weak.upgrade() else { break };
                debug!("Sync hint for {} from {}", path, message.from);
                SyncEngine { inner }.notify_remote_update(path).await;
            }
        });

        let mut state = self.inner.state.lock().await;
        if let Some(previous) = state.hint_listener.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Tells peers that `path` changed. A no-op without a messenger.
    pub async fn announce(&self, path: &str) -> SyncResult<()> {
        match &self.inner.messenger {
            Some(messenger) => {
                messenger.broadcast(HINT_TOPIC, path.as_bytes()).await?;
                debug!("Announced change to {}", path);
                Ok(())
            }
            None => {
                debug!("No messenger attached; not announcing {}", path);
                Ok(())
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Status of one path.
    pub async fn status(&self, path: &str) -> Option<SyncStatus> {
        self.inner.state.lock().await.statuses.get(path).cloned()
    }

    /// Whether `path` is watched.
    pub async fn is_watching(&self, path: &str) -> bool {
        self.inner.state.lock().await.statuses.contains_key(path)
    }

    /// Watched paths, sorted.
    pub async fn watched_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .inner
            .state
            .lock()
            .await
            .statuses
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Sum of pending changes over all watched paths.
    pub async fn pending_changes_count(&self) -> u64 {
        self.inner
            .state
            .lock()
            .await
            .statuses
            .values()
            .map(|s| s.pending_changes)
            .sum()
    }

    /// Number of queued paths.
    pub async fn queue_len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    /// Whether a drain is running.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.inner.config)
            .field("draining", &self.is_draining())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
