//! Durable key/value storage for the pending-change log, conflict log and
//! last-sync timestamp.
//!
//! Stores are dumb: they read and write strings by key. Encoding lives in the
//! typed helpers below, which treat missing or malformed values as empty.

mod libsql_store;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::{QueuedChange, SyncConflict};

pub use libsql_store::LibSqlQueueStore;
pub use memory::MemoryQueueStore;

/// Key holding the JSON array of pending changes
pub const PENDING_CHANGES_KEY: &str = "pending_changes";
/// Key holding the JSON array of unresolved conflicts
pub const CONFLICTS_KEY: &str = "sync_conflicts";
/// Key holding the RFC 3339 time of the last completed sync pass
pub const LAST_SYNC_KEY: &str = "last_sync_at";

/// String-keyed persistent storage
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value if present
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Load the pending-change log
pub async fn load_changes(store: &dyn QueueStore) -> Vec<QueuedChange> {
    load_list(store, PENDING_CHANGES_KEY).await
}

/// Load the conflict log
pub async fn load_conflicts(store: &dyn QueueStore) -> Vec<SyncConflict> {
    load_list(store, CONFLICTS_KEY).await
}

/// Load the last-sync timestamp
pub async fn load_last_sync(store: &dyn QueueStore) -> Option<DateTime<Utc>> {
    let raw = read_key(store, LAST_SYNC_KEY).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!("Ignoring malformed {LAST_SYNC_KEY} value: {error}");
            None
        }
    }
}

/// Persist the pending-change log
pub async fn save_changes(store: &dyn QueueStore, changes: &[QueuedChange]) -> Result<()> {
    save_json(store, PENDING_CHANGES_KEY, &changes).await
}

/// Persist the conflict log
pub async fn save_conflicts(store: &dyn QueueStore, conflicts: &[SyncConflict]) -> Result<()> {
    save_json(store, CONFLICTS_KEY, &conflicts).await
}

/// Persist the last-sync timestamp
pub async fn save_last_sync(store: &dyn QueueStore, at: Option<DateTime<Utc>>) -> Result<()> {
    match at {
        Some(at) => save_json(store, LAST_SYNC_KEY, &at).await,
        None => store.remove(LAST_SYNC_KEY).await,
    }
}

async fn read_key(store: &dyn QueueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!("Failed to read {key} from queue store: {error}");
            None
        }
    }
}

async fn load_list<T: DeserializeOwned>(store: &dyn QueueStore, key: &str) -> Vec<T> {
    let Some(raw) = read_key(store, key).await else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => items,
        Err(error) => {
            tracing::warn!("Discarding malformed {key} log: {error}");
            Vec::new()
        }
    }
}

async fn save_json<T: Serialize + ?Sized>(
    store: &dyn QueueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded).await
}
