//! In-process remote document store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{RemoteDocument, RemoteDocumentStore};
use crate::error::{Error, Result};
use crate::models::{Collection, DocumentData};

/// Remote store kept in memory, for tests and demos
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<HashMap<(Collection, String), RemoteDocument>>,
    failing: AtomicBool,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document with an explicit remote timestamp
    pub async fn insert_at(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentData,
        updated_at: DateTime<Utc>,
    ) {
        self.documents
            .lock()
            .await
            .insert((collection, id.to_string()), RemoteDocument { data, updated_at });
    }

    /// Make every request fail as if the network were down
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Remote("remote store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemoteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RemoteDocument>> {
        self.check_reachable()?;
        Ok(self
            .documents
            .lock()
            .await
            .get(&(collection, id.to_string()))
            .cloned())
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: &DocumentData,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_reachable()?;
        self.insert_at(collection, id, data.clone(), updated_at).await;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_reachable()?;
        self.documents
            .lock()
            .await
            .remove(&(collection, id.to_string()));
        Ok(())
    }
}
