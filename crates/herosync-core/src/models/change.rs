//! Queued change model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Collection, DocumentData};
use crate::error::{Error, Result};

/// A unique identifier for a queued change, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeId(Uuid);

impl ChangeId {
    /// Create a new unique change ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of mutation a change applies to its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation '{other}'"))),
        }
    }
}

/// A local mutation waiting to be applied to the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedChange {
    /// Assigned at enqueue time
    pub id: ChangeId,
    pub operation: Operation,
    pub collection: Collection,
    /// Target document in the remote store
    pub document_id: String,
    /// Payload to write, `None` for deletes
    pub data: Option<DocumentData>,
    /// When the change was made locally
    pub timestamp: DateTime<Utc>,
    /// Failed sync attempts so far
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedChange {
    /// Build a change stamped with a fresh id and the current time.
    ///
    /// Rejects payloads that do not match the operation or the collection.
    pub fn new(
        operation: Operation,
        collection: Collection,
        document_id: impl Into<String>,
        data: Option<DocumentData>,
    ) -> Result<Self> {
        let change = Self {
            id: ChangeId::new(),
            operation,
            collection,
            document_id: document_id.into().trim().to_string(),
            data,
            timestamp: Utc::now(),
            retry_count: 0,
        };
        change.validate()?;
        Ok(change)
    }

    /// Check the document id and that the payload fits the operation and
    /// the collection.
    pub fn validate(&self) -> Result<()> {
        if self.document_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }

        match (self.operation, &self.data) {
            (Operation::Delete, Some(_)) => Err(Error::InvalidInput(
                "delete changes must not carry data".to_string(),
            )),
            (operation @ (Operation::Create | Operation::Update), None) => Err(
                Error::InvalidInput(format!("{operation} changes require data")),
            ),
            (_, Some(payload)) => {
                if payload.collection() != self.collection {
                    return Err(Error::InvalidInput(format!(
                        "{} payload cannot be written to the {} collection",
                        payload.collection(),
                        self.collection
                    )));
                }
                payload.validate()
            }
            (Operation::Delete, None) => Ok(()),
        }
    }

    /// Whether both changes target the same document
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.collection == other.collection && self.document_id == other.document_id
    }

    /// Copy of this change after one more failed attempt
    #[must_use]
    pub fn with_failed_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }
}
