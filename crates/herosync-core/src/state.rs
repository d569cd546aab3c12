//! Observable sync state shared with UI layers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::models::SyncConflict;

/// Compact status for badges and tray icons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Offline,
    Syncing,
    Synced,
    Error,
}

/// Projection of the engine's queue, conflict log and connectivity.
///
/// Recomputed and republished after every mutation; it holds no state of its
/// own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub is_online: bool,
    pub is_syncing: bool,
    /// Number of queued changes
    pub pending_changes: usize,
    /// Unresolved conflicts, oldest first
    pub conflicts: Vec<SyncConflict>,
    /// When the last sync pass finished
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Aggregate failure message from the last pass
    pub error: Option<String>,
}

impl SyncState {
    #[must_use]
    pub const fn status(&self) -> SyncStatus {
        if !self.is_online {
            SyncStatus::Offline
        } else if self.is_syncing {
            SyncStatus::Syncing
        } else if self.error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Synced
        }
    }
}

/// Read-only subscription to [`SyncState`].
#[derive(Clone, Debug)]
pub struct SyncStateWatcher {
    rx: watch::Receiver<SyncState>,
}

impl SyncStateWatcher {
    pub(crate) const fn new(rx: watch::Receiver<SyncState>) -> Self {
        Self { rx }
    }

    /// Latest published state
    #[must_use]
    pub fn current(&self) -> SyncState {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.rx.borrow().is_online
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.rx.borrow().is_syncing
    }

    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.rx.borrow().pending_changes
    }

    #[must_use]
    pub fn conflicts(&self) -> Vec<SyncConflict> {
        self.rx.borrow().conflicts.clone()
    }

    /// Wait for the next published state.
    ///
    /// Returns `false` once the engine has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
