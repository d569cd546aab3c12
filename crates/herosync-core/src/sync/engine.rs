//! The sync engine: one instance per application session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

use super::callbacks::{ConflictCheck, RemoteSync};
use super::connectivity::ConnectivityMonitor;
use super::processor::{self, PassSummary};
use super::queue::{ChangeQueue, DEFAULT_MAX_RETRIES};
use super::resolver;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::{
    ChangeId, Collection, ConflictId, DocumentData, Operation, QueuedChange, Resolution,
    SyncConflict,
};
use crate::state::{SyncState, SyncStateWatcher};
use crate::store::{self, QueueStore};

/// Offline-first change queue with background synchronization.
///
/// Cloning is cheap; clones share the same queue, conflict log and state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

/// Configures and opens a [`SyncEngine`].
pub struct SyncEngineBuilder {
    store: Arc<dyn QueueStore>,
    online: bool,
    max_retries: u32,
    remote_sync: Option<Arc<dyn RemoteSync>>,
    conflict_check: Option<Arc<dyn ConflictCheck>>,
}

struct EngineInner {
    store: Arc<dyn QueueStore>,
    data: Mutex<EngineData>,
    syncing: AtomicBool,
    state_tx: watch::Sender<SyncState>,
    tasks: Mutex<JoinSet<()>>,
}

struct EngineData {
    queue: ChangeQueue,
    conflicts: Vec<SyncConflict>,
    connectivity: ConnectivityMonitor,
    last_sync_at: Option<DateTime<Utc>>,
    error: Option<String>,
    remote_sync: Option<Arc<dyn RemoteSync>>,
    conflict_check: Option<Arc<dyn ConflictCheck>>,
}

/// Clears the syncing flag when a pass ends, however it ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngineBuilder {
    /// Whether the host is online right now
    #[must_use]
    pub const fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Failed attempts after which a change is dropped
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Apply the engine-related parts of a loaded configuration
    #[must_use]
    pub fn config(self, config: &SyncConfig) -> Self {
        self.max_retries(config.max_retries)
    }

    #[must_use]
    pub fn remote_sync(mut self, remote_sync: Arc<dyn RemoteSync>) -> Self {
        self.remote_sync = Some(remote_sync);
        self
    }

    #[must_use]
    pub fn conflict_check(mut self, conflict_check: Arc<dyn ConflictCheck>) -> Self {
        self.conflict_check = Some(conflict_check);
        self
    }

    /// Load persisted state and open the engine.
    ///
    /// Missing or unreadable persisted data starts the engine empty. Opening
    /// never starts a sync pass by itself.
    pub async fn open(self) -> SyncEngine {
        let store_ref = self.store.as_ref();
        let queue = ChangeQueue::from_entries(store::load_changes(store_ref).await, self.max_retries);
        let conflicts = store::load_conflicts(store_ref).await;
        let last_sync_at = store::load_last_sync(store_ref).await;

        tracing::info!(
            "Opened sync engine with {} pending changes and {} conflicts",
            queue.len(),
            conflicts.len()
        );

        let data = EngineData {
            queue,
            conflicts,
            connectivity: ConnectivityMonitor::new(self.online),
            last_sync_at,
            error: None,
            remote_sync: self.remote_sync,
            conflict_check: self.conflict_check,
        };
        let (state_tx, _) = watch::channel(SyncState::default());
        let inner = EngineInner {
            store: self.store,
            data: Mutex::new(data),
            syncing: AtomicBool::new(false),
            state_tx,
            tasks: Mutex::new(JoinSet::new()),
        };
        {
            let data = inner.data.lock().await;
            inner.publish(&data);
        }

        SyncEngine {
            inner: Arc::new(inner),
        }
    }
}

impl SyncEngine {
    /// Start building an engine persisting through `store`
    pub fn builder(store: Arc<dyn QueueStore>) -> SyncEngineBuilder {
        SyncEngineBuilder {
            store,
            online: true,
            max_retries: DEFAULT_MAX_RETRIES,
            remote_sync: None,
            conflict_check: None,
        }
    }

    /// Install or replace the remote-sync callback
    pub async fn set_remote_sync(&self, remote_sync: Arc<dyn RemoteSync>) {
        self.inner.data.lock().await.remote_sync = Some(remote_sync);
    }

    /// Install, replace or remove the conflict-check callback
    pub async fn set_conflict_check(&self, conflict_check: Option<Arc<dyn ConflictCheck>>) {
        self.inner.data.lock().await.conflict_check = conflict_check;
    }

    /// Queue a local mutation.
    ///
    /// Replaces any pending change for the same document. When online, a sync
    /// pass is started in the background; the caller never waits on the
    /// network. Errors only for payloads that fail validation.
    pub async fn enqueue(
        &self,
        operation: Operation,
        collection: Collection,
        document_id: impl Into<String>,
        data: Option<DocumentData>,
    ) -> Result<ChangeId> {
        let change = QueuedChange::new(operation, collection, document_id, data)?;
        let id = change.id;
        tracing::debug!(
            "Queued {} of {}/{} as {}",
            change.operation,
            change.collection,
            change.document_id,
            id
        );

        let online = {
            let mut data = self.inner.data.lock().await;
            data.queue.enqueue(change);
            self.inner.persist_queue(&data).await;
            self.inner.publish(&data);
            data.connectivity.is_online()
        };

        if online {
            self.spawn_pass().await;
        }
        Ok(id)
    }

    /// Run a sync pass now and wait for it.
    ///
    /// Returns `None` when no pass ran: one was already in flight, the engine
    /// is offline, no remote-sync callback is installed, or nothing is queued.
    pub async fn sync_now(&self) -> Option<PassSummary> {
        self.inner.run_pass().await
    }

    /// Discard every pending change without syncing it
    pub async fn clear_queue(&self) {
        let mut data = self.inner.data.lock().await;
        let discarded = data.queue.len();
        data.queue.clear();
        self.inner.persist_queue(&data).await;
        self.inner.publish(&data);
        tracing::info!("Cleared {discarded} pending changes");
    }

    /// Settle a conflict by re-queueing the chosen data as an update.
    ///
    /// `Merge` needs `merged_data`; without it nothing happens and the
    /// conflict stays. Returns `true` when the conflict was resolved.
    pub async fn resolve_conflict(
        &self,
        conflict_id: ConflictId,
        resolution: Resolution,
        merged_data: Option<DocumentData>,
    ) -> bool {
        let online = {
            let mut data = self.inner.data.lock().await;
            let Some(position) = data
                .conflicts
                .iter()
                .position(|conflict| conflict.id == conflict_id)
            else {
                tracing::warn!("Cannot resolve unknown conflict {conflict_id}");
                return false;
            };

            let conflict = &data.conflicts[position];
            let Some(resolved) = resolver::resolved_data(conflict, resolution, merged_data) else {
                tracing::warn!(
                    "Merge resolution for conflict {conflict_id} needs merged data; leaving it unresolved"
                );
                return false;
            };

            let change = match QueuedChange::new(
                Operation::Update,
                conflict.collection,
                conflict.document_id.clone(),
                Some(resolved),
            ) {
                Ok(change) => change,
                Err(error) => {
                    tracing::warn!("Rejected resolution for conflict {conflict_id}: {error}");
                    return false;
                }
            };

            data.conflicts.remove(position);
            data.queue.enqueue(change);
            self.inner.persist_conflicts(&data).await;
            self.inner.persist_queue(&data).await;
            self.inner.publish(&data);
            tracing::info!("Resolved conflict {conflict_id} with {resolution:?}");
            data.connectivity.is_online()
        };

        if online {
            self.spawn_pass().await;
        }
        true
    }

    /// Drop a conflict without writing anything back.
    ///
    /// Returns `true` when the conflict existed.
    pub async fn dismiss_conflict(&self, conflict_id: ConflictId) -> bool {
        let mut data = self.inner.data.lock().await;
        let before = data.conflicts.len();
        data.conflicts.retain(|conflict| conflict.id != conflict_id);
        if data.conflicts.len() == before {
            tracing::warn!("Cannot dismiss unknown conflict {conflict_id}");
            return false;
        }

        self.inner.persist_conflicts(&data).await;
        self.inner.publish(&data);
        tracing::info!("Dismissed conflict {conflict_id}");
        true
    }

    /// Host regained connectivity; syncs if anything is queued
    pub async fn went_online(&self) {
        let should_sync = {
            let mut data = self.inner.data.lock().await;
            let changed = data.connectivity.went_online();
            self.inner.publish(&data);
            changed && !data.queue.is_empty()
        };

        if should_sync {
            tracing::info!("Back online; syncing pending changes");
            self.spawn_pass().await;
        }
    }

    /// Host lost connectivity; changes keep queueing
    pub async fn went_offline(&self) {
        let mut data = self.inner.data.lock().await;
        if data.connectivity.went_offline() {
            tracing::info!("Offline; queueing changes locally");
        }
        self.inner.publish(&data);
    }

    /// Record whether the host view is visible. Never starts a pass.
    pub async fn visibility_changed(&self, visible: bool) {
        let mut data = self.inner.data.lock().await;
        if data.connectivity.set_visible(visible) {
            tracing::debug!("View visibility changed to {visible}");
        }
    }

    pub async fn is_visible(&self) -> bool {
        self.inner.data.lock().await.connectivity.is_visible()
    }

    /// Snapshot of the pending changes (debugging aid)
    pub async fn queue(&self) -> Vec<QueuedChange> {
        self.inner.data.lock().await.queue.list()
    }

    /// Snapshot of the unresolved conflicts
    pub async fn conflicts(&self) -> Vec<SyncConflict> {
        self.inner.data.lock().await.conflicts.clone()
    }

    /// Latest published state
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to state updates
    #[must_use]
    pub fn subscribe(&self) -> SyncStateWatcher {
        SyncStateWatcher::new(self.inner.state_tx.subscribe())
    }

    /// Wait until every background pass started so far has finished
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.inner.tasks.lock().await);
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(error) = result {
                    tracing::warn!("Background sync pass failed: {error}");
                }
            }
        }
    }

    async fn spawn_pass(&self) {
        let inner = Arc::clone(&self.inner);
        let mut tasks = self.inner.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            inner.run_pass().await;
        });
    }
}

impl EngineInner {
    async fn run_pass(&self) -> Option<PassSummary> {
        let Some(guard) = SyncingGuard::acquire(&self.syncing) else {
            tracing::debug!("Sync pass already running; skipping trigger");
            return None;
        };

        let summary = self.process_queue().await;
        drop(guard);

        let data = self.data.lock().await;
        self.publish(&data);
        summary
    }

    async fn process_queue(&self) -> Option<PassSummary> {
        let (snapshot, remote_sync, conflict_check) = {
            let mut data = self.data.lock().await;
            if !data.connectivity.is_online() {
                tracing::debug!("Offline; skipping sync pass");
                return None;
            }
            let Some(remote_sync) = data.remote_sync.clone() else {
                tracing::debug!(
                    "No remote sync callback installed; {} changes stay queued",
                    data.queue.len()
                );
                return None;
            };
            if data.queue.is_empty() {
                return None;
            }

            data.error = None;
            self.publish(&data);
            (data.queue.list(), remote_sync, data.conflict_check.clone())
        };

        tracing::debug!("Starting sync pass over {} changes", snapshot.len());
        let outcomes =
            processor::process_snapshot(snapshot, remote_sync.as_ref(), conflict_check.as_deref())
                .await;

        let mut data = self.data.lock().await;
        let EngineData {
            queue, conflicts, ..
        } = &mut *data;
        let summary = processor::apply_outcomes(outcomes, queue, conflicts);
        data.last_sync_at = Some(Utc::now());
        data.error = summary.error_message();

        self.persist_queue(&data).await;
        if summary.conflicted > 0 {
            self.persist_conflicts(&data).await;
        }
        if let Err(error) = store::save_last_sync(self.store.as_ref(), data.last_sync_at).await {
            tracing::warn!("Failed to persist last sync time: {error}");
        }

        tracing::info!(
            "Sync pass finished: {} applied, {} conflicted, {} failed ({} dropped), {} pending",
            summary.applied,
            summary.conflicted,
            summary.failed,
            summary.dropped,
            data.queue.len()
        );
        Some(summary)
    }

    async fn persist_queue(&self, data: &EngineData) {
        if let Err(error) = store::save_changes(self.store.as_ref(), data.queue.as_slice()).await {
            tracing::warn!("Failed to persist pending changes; keeping them in memory: {error}");
        }
    }

    async fn persist_conflicts(&self, data: &EngineData) {
        if let Err(error) = store::save_conflicts(self.store.as_ref(), &data.conflicts).await {
            tracing::warn!("Failed to persist conflict log; keeping it in memory: {error}");
        }
    }

    fn publish(&self, data: &EngineData) {
        self.state_tx.send_replace(SyncState {
            is_online: data.connectivity.is_online(),
            is_syncing: self.syncing.load(Ordering::SeqCst),
            pending_changes: data.queue.len(),
            conflicts: data.conflicts.clone(),
            last_sync_at: data.last_sync_at,
            error: data.error.clone(),
        });
    }
}
