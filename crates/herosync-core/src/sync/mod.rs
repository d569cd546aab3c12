//! Offline mutation queue and sync engine.
//!
//! Local edits are queued as [`QueuedChange`](crate::models::QueuedChange)s,
//! persisted, and drained in FIFO order against a remote store whenever the
//! host is online. Updates can be held back as conflicts for the user to
//! resolve.

mod callbacks;
mod connectivity;
mod engine;
mod processor;
mod queue;
mod resolver;

pub use callbacks::{ConflictCheck, RemoteSync};
pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use processor::{apply_outcomes, process_snapshot, ChangeOutcome, PassSummary};
pub use queue::{ChangeQueue, Requeue, DEFAULT_MAX_RETRIES};
pub use resolver::resolved_data;

#[cfg(test)]
mod tests;
