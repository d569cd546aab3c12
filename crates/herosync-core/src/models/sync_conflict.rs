//! Sync conflict model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::change::QueuedChange;
use super::document::{Collection, DocumentData};
use crate::error::Error;

/// Identifier for a recorded conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictId(Uuid);

impl ConflictId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A queued update whose target was modified remotely in the meantime.
///
/// Stays in the conflict log until the user resolves or dismisses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub id: ConflictId,
    pub document_id: String,
    pub collection: Collection,
    /// Local payload at detection time
    pub local_data: DocumentData,
    /// Remote payload at detection time
    pub remote_data: DocumentData,
    pub local_timestamp: DateTime<Utc>,
    pub remote_timestamp: DateTime<Utc>,
}

impl SyncConflict {
    /// Record a conflict between a queued change and the remote document.
    ///
    /// Returns `None` for changes without a payload (deletes).
    #[must_use]
    pub fn from_change(
        change: &QueuedChange,
        remote_data: DocumentData,
        remote_timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let local_data = change.data.clone()?;
        Some(Self {
            id: ConflictId::new(),
            document_id: change.document_id.clone(),
            collection: change.collection,
            local_data,
            remote_data,
            local_timestamp: change.timestamp,
            remote_timestamp,
        })
    }
}

/// How the user settles a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Write the local snapshot back to the remote store
    KeepLocal,
    /// Adopt the remote snapshot
    KeepRemote,
    /// Write caller-supplied merged data
    Merge,
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "keep_local" | "local" => Ok(Self::KeepLocal),
            "keep_remote" | "remote" => Ok(Self::KeepRemote),
            "merge" => Ok(Self::Merge),
            other => Err(Error::InvalidInput(format!(
                "unknown resolution '{other}' (expected local, remote or merge)"
            ))),
        }
    }
}
