use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] herosync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid document data: {0}")]
    InvalidData(String),
    #[error("{0} requires document data (--data or --file)")]
    MissingData(String),
    #[error("Conflict not found for id/prefix: {0}")]
    ConflictNotFound(String),
    #[error("{0}")]
    AmbiguousConflictId(String),
    #[error("Conflict {0} could not be resolved; see the log for details")]
    ResolutionRejected(String),
    #[error(
        "Sync is not configured. Set remote_url in the config file or HEROSYNC_REMOTE_URL in the environment."
    )]
    SyncNotConfigured,
}
