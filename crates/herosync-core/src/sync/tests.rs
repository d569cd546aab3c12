use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use super::*;
use crate::error::{Error, Result};
use crate::models::{
    CharacterSheet, Collection, DocumentData, Operation, QueuedChange, Resolution, SyncConflict,
};
use crate::remote::{MemoryRemoteStore, RemoteDocumentStore, RemoteStoreSync};
use crate::state::SyncStatus;
use crate::store::{LibSqlQueueStore, MemoryQueueStore, QueueStore, PENDING_CHANGES_KEY};

/// Records every change it sees and answers with a fixed result
struct RecordingRemote {
    accept: bool,
    seen: Mutex<Vec<String>>,
}

impl RecordingRemote {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSync for RecordingRemote {
    async fn sync_change(&self, change: &QueuedChange) -> Result<bool> {
        self.seen.lock().unwrap().push(change.document_id.clone());
        Ok(self.accept)
    }
}

/// Blocks inside its first call until released
struct GatedRemote {
    accept: bool,
    gate_first: AtomicBool,
    entered: Notify,
    release: Notify,
    seen: Mutex<Vec<String>>,
}

impl GatedRemote {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            gate_first: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSync for GatedRemote {
    async fn sync_change(&self, change: &QueuedChange) -> Result<bool> {
        self.seen.lock().unwrap().push(change.document_id.clone());
        if self.gate_first.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(self.accept)
    }
}

/// Holds the first write at the gate, then writes through to a remote store
struct GatedStoreWrites {
    gate: Arc<GatedRemote>,
    adapter: RemoteStoreSync,
}

#[async_trait]
impl RemoteSync for GatedStoreWrites {
    async fn sync_change(&self, change: &QueuedChange) -> Result<bool> {
        self.gate.sync_change(change).await?;
        self.adapter.sync_change(change).await
    }
}

struct ConflictOn(&'static str);

#[async_trait]
impl ConflictCheck for ConflictOn {
    async fn check(&self, change: &QueuedChange) -> Result<Option<SyncConflict>> {
        if change.document_id == self.0 {
            Ok(SyncConflict::from_change(
                change,
                sheet("Remote"),
                Utc::now(),
            ))
        } else {
            Ok(None)
        }
    }
}

struct BrokenCheck;

#[async_trait]
impl ConflictCheck for BrokenCheck {
    async fn check(&self, _change: &QueuedChange) -> Result<Option<SyncConflict>> {
        Err(Error::Remote("lookup timed out".to_string()))
    }
}

fn sheet(name: &str) -> DocumentData {
    DocumentData::Character(CharacterSheet::new(name))
}

fn builder() -> SyncEngineBuilder {
    SyncEngine::builder(Arc::new(MemoryQueueStore::new()))
}

async fn update(engine: &SyncEngine, document_id: &str, name: &str) {
    engine
        .enqueue(
            Operation::Update,
            Collection::Characters,
            document_id,
            Some(sheet(name)),
        )
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_later_change_replaces_earlier_for_same_document() {
    let engine = builder().open().await;

    engine
        .enqueue(
            Operation::Create,
            Collection::Characters,
            "c1",
            Some(sheet("Ana")),
        )
        .await
        .unwrap();
    update(&engine, "c1", "Ana2").await;
    engine.wait_idle().await;

    let queue = engine.queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, Operation::Update);
    assert_eq!(queue[0].data, Some(sheet("Ana2")));
    assert_eq!(engine.state().pending_changes, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_change_is_dropped_after_three_passes() {
    let engine = builder().open().await;
    update(&engine, "c1", "Ana").await;
    engine.wait_idle().await;
    let remote = RecordingRemote::new(false);
    engine.set_remote_sync(remote.clone()).await;

    let first = engine.sync_now().await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(engine.queue().await[0].retry_count, 1);

    engine.sync_now().await.unwrap();
    assert_eq!(engine.queue().await[0].retry_count, 2);

    let third = engine.sync_now().await.unwrap();
    assert_eq!(third.dropped, 1);
    assert!(engine.queue().await.is_empty());
    assert_eq!(engine.state().pending_changes, 0);
    assert_eq!(remote.seen().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_background_pass_counts_toward_retry_limit() {
    let remote = RecordingRemote::new(false);
    let engine = builder().remote_sync(remote.clone()).open().await;

    update(&engine, "c1", "Ana").await;
    engine.wait_idle().await;
    assert_eq!(engine.queue().await[0].retry_count, 1);

    engine.sync_now().await;
    engine.sync_now().await;
    assert!(engine.queue().await.is_empty());
    assert_eq!(remote.seen().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conflicting_update_moves_to_conflict_log() {
    let remote = RecordingRemote::new(true);
    let engine = builder()
        .remote_sync(remote.clone())
        .conflict_check(Arc::new(ConflictOn("c2")))
        .open()
        .await;

    update(&engine, "c1", "Ana").await;
    engine.wait_idle().await;
    update(&engine, "c2", "Bo").await;
    engine.wait_idle().await;

    let conflicts = engine.conflicts().await;
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].document_id, "c2");
    assert_eq!(conflicts[0].local_data, sheet("Bo"));
    assert_eq!(conflicts[0].remote_data, sheet("Remote"));
    assert!(engine.queue().await.is_empty());
    assert_eq!(remote.seen(), vec!["c1"]);
    assert_eq!(engine.state().conflicts, conflicts);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offline_changes_sync_in_one_pass_when_back_online() {
    let remote = RecordingRemote::new(true);
    let engine = builder().remote_sync(remote.clone()).open().await;

    engine.went_offline().await;
    assert_eq!(engine.state().status(), SyncStatus::Offline);
    update(&engine, "c1", "Ana").await;
    update(&engine, "c2", "Bo").await;
    engine.wait_idle().await;
    assert!(remote.seen().is_empty());
    assert_eq!(engine.state().pending_changes, 2);

    engine.went_online().await;
    engine.wait_idle().await;
    assert_eq!(remote.seen(), vec!["c1", "c2"]);
    assert!(engine.queue().await.is_empty());
    assert!(engine.state().last_sync_at.is_some());

    // repeated online signal is not an edge
    engine.went_online().await;
    engine.wait_idle().await;
    assert_eq!(remote.seen().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dismiss_removes_conflict_without_queueing() {
    let engine = builder()
        .remote_sync(RecordingRemote::new(true))
        .conflict_check(Arc::new(ConflictOn("c2")))
        .open()
        .await;
    update(&engine, "c2", "Bo").await;
    engine.wait_idle().await;
    let conflict_id = engine.conflicts().await[0].id;

    assert!(engine.dismiss_conflict(conflict_id).await);
    assert!(engine.conflicts().await.is_empty());
    assert!(engine.queue().await.is_empty());
    assert!(!engine.dismiss_conflict(conflict_id).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resolutions_requeue_chosen_data() {
    let engine = builder()
        .remote_sync(RecordingRemote::new(true))
        .conflict_check(Arc::new(ConflictOn("c2")))
        .open()
        .await;
    update(&engine, "c2", "Bo").await;
    engine.wait_idle().await;
    engine.went_offline().await;
    let conflict = engine.conflicts().await.remove(0);

    // merge without data leaves everything as it was
    assert!(
        !engine
            .resolve_conflict(conflict.id, Resolution::Merge, None)
            .await
    );
    assert_eq!(engine.conflicts().await.len(), 1);
    assert!(engine.queue().await.is_empty());

    assert!(
        engine
            .resolve_conflict(conflict.id, Resolution::KeepLocal, None)
            .await
    );
    assert!(engine.conflicts().await.is_empty());
    let queue = engine.queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].operation, Operation::Update);
    assert_eq!(queue[0].document_id, "c2");
    assert_eq!(queue[0].data, Some(conflict.local_data.clone()));
    assert_eq!(queue[0].retry_count, 0);

    assert!(
        !engine
            .resolve_conflict(conflict.id, Resolution::KeepRemote, None)
            .await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_merge_resolution_validates_merged_data() {
    let engine = builder()
        .online(false)
        .conflict_check(Arc::new(ConflictOn("c2")))
        .open()
        .await;
    update(&engine, "c2", "Bo").await;
    engine.set_remote_sync(RecordingRemote::new(true)).await;
    engine.went_online().await;
    engine.wait_idle().await;
    engine.went_offline().await;
    let conflict_id = engine.conflicts().await[0].id;

    let mut invalid = CharacterSheet::new("Bo");
    invalid.level = 0;
    assert!(
        !engine
            .resolve_conflict(
                conflict_id,
                Resolution::Merge,
                Some(DocumentData::Character(invalid))
            )
            .await
    );
    assert_eq!(engine.conflicts().await.len(), 1);

    assert!(
        engine
            .resolve_conflict(conflict_id, Resolution::Merge, Some(sheet("Bo & Remote")))
            .await
    );
    assert_eq!(engine.queue().await[0].data, Some(sheet("Bo & Remote")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overlapping_trigger_is_skipped() {
    let remote = GatedRemote::new(true);
    let engine = builder().remote_sync(remote.clone()).open().await;

    update(&engine, "c1", "Ana").await;
    remote.entered.notified().await;
    assert!(engine.state().is_syncing);
    assert_eq!(engine.state().status(), SyncStatus::Syncing);
    assert!(engine.sync_now().await.is_none());

    remote.release.notify_one();
    engine.wait_idle().await;
    assert!(!engine.state().is_syncing);
    assert_eq!(remote.seen(), vec!["c1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_change_enqueued_during_pass_waits_for_next_trigger() {
    let remote = GatedRemote::new(true);
    let engine = builder().remote_sync(remote.clone()).open().await;

    update(&engine, "c1", "Ana").await;
    remote.entered.notified().await;
    update(&engine, "c2", "Bo").await;
    // keeps the trigger from c2 from running a second pass
    engine.went_offline().await;
    remote.release.notify_one();
    engine.wait_idle().await;

    let queue = engine.queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].document_id, "c2");
    assert_eq!(queue[0].retry_count, 0);

    engine.went_online().await;
    engine.wait_idle().await;
    assert!(engine.queue().await.is_empty());
    assert_eq!(remote.seen(), vec!["c1", "c2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replacement_during_pass_survives_failed_original() {
    let remote = GatedRemote::new(false);
    let engine = builder().remote_sync(remote.clone()).open().await;

    update(&engine, "c1", "Ana").await;
    remote.entered.notified().await;
    update(&engine, "c1", "Ana2").await;
    engine.went_offline().await;
    remote.release.notify_one();
    engine.wait_idle().await;

    let queue = engine.queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].data, Some(sheet("Ana2")));
    assert_eq!(queue[0].retry_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_own_in_flight_write_is_not_a_conflict_for_later_edit() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let adapter = RemoteStoreSync::new(remote.clone());
    let gate = GatedRemote::new(true);
    let writes = Arc::new(GatedStoreWrites {
        gate: gate.clone(),
        adapter: adapter.clone(),
    });
    let engine = builder()
        .remote_sync(writes)
        .conflict_check(Arc::new(adapter))
        .open()
        .await;

    engine
        .enqueue(
            Operation::Create,
            Collection::Characters,
            "c1",
            Some(sheet("Ana")),
        )
        .await
        .unwrap();
    gate.entered.notified().await;
    update(&engine, "c1", "Ana2").await;
    engine.went_offline().await;
    gate.release.notify_one();
    engine.wait_idle().await;

    engine.went_online().await;
    engine.wait_idle().await;

    assert!(engine.conflicts().await.is_empty());
    assert!(engine.queue().await.is_empty());
    assert_eq!(engine.state().error, None);
    let stored = remote
        .get(Collection::Characters, "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.data, sheet("Ana2"));
    assert_eq!(gate.seen(), vec!["c1", "c1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_skips_pass_without_callback_offline_or_empty() {
    let engine = builder().open().await;
    assert!(engine.sync_now().await.is_none());

    update(&engine, "c1", "Ana").await;
    engine.wait_idle().await;
    assert!(engine.sync_now().await.is_none());
    assert_eq!(engine.queue().await.len(), 1);
    assert_eq!(engine.state().last_sync_at, None);
    assert_eq!(engine.state().error, None);

    engine.set_remote_sync(RecordingRemote::new(true)).await;
    engine.went_offline().await;
    assert!(engine.sync_now().await.is_none());
    assert_eq!(engine.queue().await.len(), 1);

    engine.went_online().await;
    engine.wait_idle().await;
    assert!(engine.queue().await.is_empty());
    assert!(engine.sync_now().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_pass_surfaces_error_until_clean_pass() {
    let engine = builder().open().await;
    update(&engine, "c1", "Ana").await;
    update(&engine, "c2", "Bo").await;
    engine.wait_idle().await;
    engine.set_remote_sync(RecordingRemote::new(false)).await;

    engine.sync_now().await.unwrap();
    let state = engine.state();
    assert_eq!(state.error.as_deref(), Some("2 changes failed to sync"));
    assert_eq!(state.status(), SyncStatus::Error);

    engine.set_remote_sync(RecordingRemote::new(true)).await;
    engine.sync_now().await.unwrap();
    assert_eq!(engine.state().error, None);
    assert_eq!(engine.state().status(), SyncStatus::Synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conflict_check_error_counts_as_failure() {
    let remote = RecordingRemote::new(true);
    let engine = builder()
        .online(false)
        .remote_sync(remote.clone())
        .conflict_check(Arc::new(BrokenCheck))
        .open()
        .await;
    update(&engine, "c1", "Ana").await;
    engine.went_online().await;
    engine.wait_idle().await;

    assert!(remote.seen().is_empty());
    assert_eq!(engine.queue().await[0].retry_count, 1);
    assert!(engine.conflicts().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deletes_skip_conflict_check() {
    let remote = RecordingRemote::new(true);
    let engine = builder()
        .remote_sync(remote.clone())
        .conflict_check(Arc::new(ConflictOn("c2")))
        .open()
        .await;
    engine
        .enqueue(Operation::Delete, Collection::Characters, "c2", None)
        .await
        .unwrap();
    engine.wait_idle().await;

    assert_eq!(remote.seen(), vec!["c2"]);
    assert!(engine.conflicts().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_enqueue_is_rejected_and_not_queued() {
    let engine = builder().open().await;
    let result = engine
        .enqueue(
            Operation::Update,
            Collection::Preferences,
            "prefs",
            Some(sheet("Ana")),
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(engine.queue().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_storage_failure_keeps_changes_in_memory() {
    let store = Arc::new(MemoryQueueStore::new());
    store.set_failing(true);
    let engine = SyncEngine::builder(store.clone()).open().await;

    update(&engine, "c1", "Ana").await;
    assert_eq!(engine.queue().await.len(), 1);
    assert_eq!(engine.state().pending_changes, 1);

    engine.wait_idle().await;
    store.set_failing(false);
    engine.set_remote_sync(RecordingRemote::new(true)).await;
    assert_eq!(engine.sync_now().await.unwrap().applied, 1);
    let persisted = store.get(PENDING_CHANGES_KEY).await.unwrap();
    assert_eq!(persisted.as_deref(), Some("[]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");

    {
        let store = LibSqlQueueStore::open(&path).await.unwrap();
        let engine = SyncEngine::builder(Arc::new(store))
            .conflict_check(Arc::new(ConflictOn("c2")))
            .open()
            .await;
        update(&engine, "c1", "Ana").await;
        update(&engine, "c2", "Bo").await;
        engine.wait_idle().await;
        engine.set_remote_sync(RecordingRemote::new(false)).await;
        engine.sync_now().await.unwrap();
        assert_eq!(engine.conflicts().await.len(), 1);
    }

    let store = LibSqlQueueStore::open(&path).await.unwrap();
    let engine = SyncEngine::builder(Arc::new(store)).open().await;
    let queue = engine.queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].document_id, "c1");
    assert_eq!(queue[0].retry_count, 1);
    assert_eq!(engine.conflicts().await.len(), 1);

    let state = engine.state();
    assert_eq!(state.pending_changes, 1);
    assert!(state.last_sync_at.is_some());
    // errors are not persisted
    assert_eq!(state.error, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_opening_skips_stored_changes_that_fail_validation() {
    let store = Arc::new(MemoryQueueStore::new());
    let mut broken = QueuedChange::new(
        Operation::Update,
        Collection::Characters,
        "c1",
        Some(sheet("Ana")),
    )
    .unwrap();
    if let Some(DocumentData::Character(sheet)) = broken.data.as_mut() {
        sheet.level = 0;
    }
    let kept = QueuedChange::new(Operation::Delete, Collection::Characters, "c2", None).unwrap();
    let encoded = serde_json::to_string(&vec![broken, kept.clone()]).unwrap();
    store.set(PENDING_CHANGES_KEY, &encoded).await.unwrap();

    let engine = SyncEngine::builder(store).open().await;
    assert_eq!(engine.queue().await, vec![kept]);
    assert_eq!(engine.state().pending_changes, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_opening_does_not_start_a_pass() {
    let store = Arc::new(MemoryQueueStore::new());
    let first = SyncEngine::builder(store.clone()).open().await;
    update(&first, "c1", "Ana").await;
    drop(first);

    let remote = RecordingRemote::new(true);
    let engine = SyncEngine::builder(store)
        .remote_sync(remote.clone())
        .open()
        .await;
    engine.wait_idle().await;
    assert!(remote.seen().is_empty());
    assert_eq!(engine.queue().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_visibility_changes_never_sync() {
    let engine = builder().open().await;
    update(&engine, "c1", "Ana").await;
    engine.wait_idle().await;
    let remote = RecordingRemote::new(true);
    engine.set_remote_sync(remote.clone()).await;

    engine.visibility_changed(false).await;
    assert!(!engine.is_visible().await);
    engine.visibility_changed(true).await;
    engine.wait_idle().await;

    assert!(remote.seen().is_empty());
    assert_eq!(engine.queue().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_queue_discards_pending_changes() {
    let engine = builder().online(false).open().await;
    update(&engine, "c1", "Ana").await;
    update(&engine, "c2", "Bo").await;

    engine.clear_queue().await;
    assert!(engine.queue().await.is_empty());
    assert_eq!(engine.state().pending_changes, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscribers_see_published_state() {
    let engine = builder().online(false).max_retries(5).open().await;
    let mut watcher = engine.subscribe();
    assert!(!watcher.is_online());

    update(&engine, "c1", "Ana").await;
    assert!(watcher.changed().await);
    assert_eq!(watcher.pending_changes(), 1);

    engine.went_online().await;
    engine.wait_idle().await;
    assert!(watcher.changed().await);
    assert!(watcher.is_online());
    assert_eq!(watcher.current().status(), SyncStatus::Synced);
}
