//! One sync pass over a queue snapshot

use std::collections::HashSet;

use serde::Serialize;

use super::callbacks::{ConflictCheck, RemoteSync};
use super::queue::{ChangeQueue, Requeue};
use crate::models::{Operation, QueuedChange, SyncConflict};

/// How a single change fared during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Written to the remote store
    Applied,
    /// Absorbed into a conflict; never written
    Conflicted(SyncConflict),
    /// Remote write failed or was rejected
    Failed,
}

/// Counts for one finished pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub applied: usize,
    pub conflicted: usize,
    pub failed: usize,
    /// Failed changes removed because they reached the retry limit
    pub dropped: usize,
}

impl PassSummary {
    /// Aggregate error surfaced in the observable state
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        (self.failed > 0).then(|| format!("{} changes failed to sync", self.failed))
    }
}

/// Run every change of `snapshot` through the callbacks, strictly in order.
///
/// Each change is awaited before the next starts; one failing change never
/// stops the rest of the pass.
pub async fn process_snapshot(
    snapshot: Vec<QueuedChange>,
    remote: &dyn RemoteSync,
    conflict_check: Option<&dyn ConflictCheck>,
) -> Vec<(QueuedChange, ChangeOutcome)> {
    let mut outcomes = Vec::with_capacity(snapshot.len());
    for change in snapshot {
        let outcome = process_change(&change, remote, conflict_check).await;
        outcomes.push((change, outcome));
    }
    outcomes
}

async fn process_change(
    change: &QueuedChange,
    remote: &dyn RemoteSync,
    conflict_check: Option<&dyn ConflictCheck>,
) -> ChangeOutcome {
    if change.operation == Operation::Update {
        if let Some(check) = conflict_check {
            match check.check(change).await {
                Ok(Some(conflict)) => {
                    tracing::info!(
                        "Conflict detected for {}/{}; holding change {} for review",
                        change.collection,
                        change.document_id,
                        change.id
                    );
                    return ChangeOutcome::Conflicted(conflict);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        "Conflict check failed for {}/{}: {error}",
                        change.collection,
                        change.document_id
                    );
                    return ChangeOutcome::Failed;
                }
            }
        }
    }

    match remote.sync_change(change).await {
        Ok(true) => ChangeOutcome::Applied,
        Ok(false) => {
            tracing::debug!(
                "Remote rejected {} of {}/{}",
                change.operation,
                change.collection,
                change.document_id
            );
            ChangeOutcome::Failed
        }
        Err(error) => {
            tracing::warn!(
                "Failed to sync {} of {}/{}: {error}",
                change.operation,
                change.collection,
                change.document_id
            );
            ChangeOutcome::Failed
        }
    }
}

/// Fold pass outcomes into the live queue and conflict log.
///
/// Outcomes are matched by change id, so entries enqueued while the pass was
/// running stay untouched and entries replaced meanwhile are not revived.
pub fn apply_outcomes(
    outcomes: Vec<(QueuedChange, ChangeOutcome)>,
    queue: &mut ChangeQueue,
    conflicts: &mut Vec<SyncConflict>,
) -> PassSummary {
    let mut summary = PassSummary::default();
    let mut finished = HashSet::new();

    for (change, outcome) in outcomes {
        match outcome {
            ChangeOutcome::Applied => {
                summary.applied += 1;
                finished.insert(change.id);
            }
            ChangeOutcome::Conflicted(conflict) => {
                summary.conflicted += 1;
                finished.insert(change.id);
                conflicts.push(conflict);
            }
            ChangeOutcome::Failed => {
                summary.failed += 1;
                if queue.requeue(&change) == Requeue::Dropped {
                    summary.dropped += 1;
                    tracing::warn!(
                        "Dropping {} of {}/{} after {} failed attempts",
                        change.operation,
                        change.collection,
                        change.document_id,
                        queue.max_retries()
                    );
                }
            }
        }
    }

    queue.dequeue(&finished);
    summary
}
