//! Remote document stores and the adapter that turns one into sync callbacks.

mod http;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Collection, DocumentData, Operation, QueuedChange, SyncConflict};
use crate::sync::{ConflictCheck, RemoteSync};

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

/// A document as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub data: DocumentData,
    /// Last write time as recorded by the remote side
    pub updated_at: DateTime<Utc>,
}

/// Authoritative document storage the queue drains into
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetch a document, `None` when it does not exist
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RemoteDocument>>;

    /// Create or overwrite a document, recording `updated_at` as its write
    /// time. Callers pass the edit time of the change being written.
    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: &DocumentData,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// Drives a [`RemoteDocumentStore`] as both the remote-sync and the
/// conflict-check callback.
#[derive(Clone)]
pub struct RemoteStoreSync {
    store: Arc<dyn RemoteDocumentStore>,
}

impl RemoteStoreSync {
    pub fn new(store: Arc<dyn RemoteDocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteSync for RemoteStoreSync {
    async fn sync_change(&self, change: &QueuedChange) -> Result<bool> {
        match (change.operation, &change.data) {
            (Operation::Delete, _) => {
                self.store
                    .delete(change.collection, &change.document_id)
                    .await?;
            }
            (_, Some(data)) => {
                self.store
                    .set(change.collection, &change.document_id, data, change.timestamp)
                    .await?;
            }
            (_, None) => {
                tracing::warn!(
                    "Refusing to write {} of {}/{} without data",
                    change.operation,
                    change.collection,
                    change.document_id
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ConflictCheck for RemoteStoreSync {
    async fn check(&self, change: &QueuedChange) -> Result<Option<SyncConflict>> {
        let Some(local) = change.data.as_ref() else {
            return Ok(None);
        };
        let Some(remote) = self
            .store
            .get(change.collection, &change.document_id)
            .await?
        else {
            return Ok(None);
        };

        if remote.updated_at > change.timestamp && remote.data != *local {
            Ok(SyncConflict::from_change(
                change,
                remote.data,
                remote.updated_at,
            ))
        } else {
            Ok(None)
        }
    }
}
