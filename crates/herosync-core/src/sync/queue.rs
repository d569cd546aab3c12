//! In-memory change queue with per-document replacement semantics

use std::collections::HashSet;

use crate::models::{ChangeId, Collection, QueuedChange};

/// Default number of failed attempts after which a change is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// What happened to a change handed to [`ChangeQueue::requeue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Still queued with an incremented retry count
    Retrying,
    /// Removed after reaching the retry limit
    Dropped,
    /// Not in the queue any more (replaced or removed meanwhile)
    Missing,
}

/// Ordered log of pending changes.
///
/// Holds at most one change per `(collection, document_id)`; enqueueing a
/// change for a document that already has one replaces it and moves it to
/// the back.
#[derive(Debug, Clone)]
pub struct ChangeQueue {
    entries: Vec<QueuedChange>,
    max_retries: u32,
}

impl Default for ChangeQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl ChangeQueue {
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            entries: Vec::new(),
            max_retries,
        }
    }

    /// Rebuild a queue from persisted entries, keeping the last entry per
    /// document if the stored log contains duplicates. Entries that no longer
    /// validate are dropped with a warning.
    #[must_use]
    pub fn from_entries(entries: Vec<QueuedChange>, max_retries: u32) -> Self {
        let mut queue = Self::new(max_retries);
        for change in entries {
            if let Err(error) = change.validate() {
                tracing::warn!(
                    "Dropping stored {} of {}/{}: {error}",
                    change.operation,
                    change.collection,
                    change.document_id
                );
                continue;
            }
            queue.enqueue(change);
        }
        queue
    }

    /// Append a change, replacing any pending change for the same document
    pub fn enqueue(&mut self, change: QueuedChange) {
        self.entries.retain(|existing| !existing.same_target(&change));
        self.entries.push(change);
    }

    /// Remove the given changes; returns how many were present
    pub fn dequeue(&mut self, ids: &HashSet<ChangeId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|change| !ids.contains(&change.id));
        before - self.entries.len()
    }

    /// Record a failed attempt for `change`.
    ///
    /// The entry is replaced by a copy with `retry_count + 1`, or dropped once
    /// that count reaches the retry limit. A change that has been replaced or
    /// removed in the meantime is left alone.
    pub fn requeue(&mut self, change: &QueuedChange) -> Requeue {
        let Some(position) = self.entries.iter().position(|entry| entry.id == change.id) else {
            return Requeue::Missing;
        };

        let retried = change.with_failed_attempt();
        if retried.retry_count >= self.max_retries {
            self.entries.remove(position);
            Requeue::Dropped
        } else {
            self.entries[position] = retried;
            Requeue::Retrying
        }
    }

    /// Owned snapshot of the pending changes, in processing order
    #[must_use]
    pub fn list(&self) -> Vec<QueuedChange> {
        self.entries.clone()
    }

    /// Borrow the entries for persistence
    #[must_use]
    pub fn as_slice(&self) -> &[QueuedChange] {
        &self.entries
    }

    /// Drop every pending change without syncing it
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending change for a document, if any
    #[must_use]
    pub fn find(&self, collection: Collection, document_id: &str) -> Option<&QueuedChange> {
        self.entries
            .iter()
            .find(|change| change.collection == collection && change.document_id == document_id)
    }

    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
