//! herosync-core - offline change queue and sync engine
//!
//! Character sheets and editor preferences are edited locally; every mutation
//! is queued, persisted and pushed to a remote document store whenever the
//! host is online. Concurrent remote edits surface as conflicts for the user
//! to resolve.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{
    ChangeId, Collection, ConflictId, DocumentData, Operation, QueuedChange, Resolution,
    SyncConflict,
};
pub use state::{SyncState, SyncStateWatcher, SyncStatus};
pub use sync::{SyncEngine, SyncEngineBuilder};
