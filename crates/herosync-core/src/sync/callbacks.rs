//! Caller-supplied hooks the sync processor drives per change

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{QueuedChange, SyncConflict};

/// Applies one queued change to the remote store.
///
/// `Ok(true)` means the change was applied. `Ok(false)` and `Err(_)` both
/// count as a failed attempt and the change is retried on a later pass.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn sync_change(&self, change: &QueuedChange) -> Result<bool>;
}

/// Detects concurrent remote modifications before an update is written.
///
/// Returning a conflict moves the change into the conflict log instead of
/// writing it.
#[async_trait]
pub trait ConflictCheck: Send + Sync {
    async fn check(&self, change: &QueuedChange) -> Result<Option<SyncConflict>>;
}
