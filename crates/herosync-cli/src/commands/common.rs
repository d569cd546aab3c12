use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use herosync_core::models::{CharacterSheet, Preferences};
use herosync_core::remote::{HttpRemoteStore, RemoteStoreSync};
use herosync_core::store::LibSqlQueueStore;
use herosync_core::{
    Collection, ConflictId, DocumentData, QueuedChange, SyncConflict, SyncEngine, SyncState,
    SyncStatus,
};
use serde::Serialize;

use crate::context::CliContext;
use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub status: SyncStatus,
    #[serde(flatten)]
    pub state: SyncState,
}

/// Open the engine over the on-disk queue, wired to the HTTP remote when one
/// is configured.
pub async fn open_engine(ctx: &CliContext) -> Result<SyncEngine, CliError> {
    let store = LibSqlQueueStore::open(ctx.store_path()).await?;
    let mut builder = SyncEngine::builder(Arc::new(store))
        .config(&ctx.config)
        .online(!ctx.offline);

    if let Some(url) = ctx.config.remote_url.as_deref() {
        let remote = HttpRemoteStore::new(url, ctx.config.request_timeout())?;
        let adapter = Arc::new(RemoteStoreSync::new(Arc::new(remote)));
        builder = builder.remote_sync(adapter.clone()).conflict_check(adapter);
    }

    Ok(builder.open().await)
}

pub const fn is_sync_configured(ctx: &CliContext) -> bool {
    ctx.config.remote_url.is_some()
}

/// Read document JSON from `--data` or `--file`
pub fn read_document_json(
    data: Option<String>,
    file: Option<&Path>,
) -> Result<Option<String>, CliError> {
    if let Some(path) = file {
        return Ok(Some(std::fs::read_to_string(path)?));
    }
    Ok(data.filter(|raw| !raw.trim().is_empty()))
}

/// Parse a bare payload for `collection` into tagged document data
pub fn parse_document(collection: Collection, raw: &str) -> Result<DocumentData, CliError> {
    let invalid = |error: serde_json::Error| CliError::InvalidData(error.to_string());
    let data = match collection {
        Collection::Characters => {
            DocumentData::Character(serde_json::from_str::<CharacterSheet>(raw).map_err(invalid)?)
        }
        Collection::Preferences => {
            DocumentData::Preferences(serde_json::from_str::<Preferences>(raw).map_err(invalid)?)
        }
    };
    data.validate()?;
    Ok(data)
}

/// Match a full conflict id or a unique prefix of one
pub fn resolve_conflict_id(
    query: &str,
    conflicts: &[SyncConflict],
) -> Result<ConflictId, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::ConflictNotFound(query.to_string()));
    }
    if let Ok(id) = query.parse::<ConflictId>() {
        if conflicts.iter().any(|conflict| conflict.id == id) {
            return Ok(id);
        }
    }

    let matches = conflicts
        .iter()
        .filter(|conflict| conflict.id.to_string().starts_with(query))
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [] => Err(CliError::ConflictNotFound(query.to_string())),
        [conflict] => Ok(conflict.id),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|conflict| short_id(&conflict.id.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousConflictId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_change_lines(changes: &[QueuedChange]) -> Vec<String> {
    changes
        .iter()
        .map(|change| {
            let target = format!("{}/{}", change.collection, change.document_id);
            let line = format!(
                "{}  {:<6}  {target:<32}  {}",
                short_id(&change.id.to_string()),
                change.operation,
                format_timestamp(change.timestamp)
            );
            if change.retry_count > 0 {
                format!("{line}  retries={}", change.retry_count)
            } else {
                line
            }
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {}/{}  local={} remote={}",
                short_id(&conflict.id.to_string()),
                conflict.collection,
                conflict.document_id,
                format_timestamp(conflict.local_timestamp),
                format_timestamp(conflict.remote_timestamp)
            )
        })
        .collect()
}

pub fn format_status_lines(state: &SyncState) -> Vec<String> {
    let status = match state.status() {
        SyncStatus::Offline => "offline",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Synced => "synced",
        SyncStatus::Error => "error",
    };
    let mut lines = vec![
        format!("Status:    {status}"),
        format!("Pending:   {}", state.pending_changes),
        format!("Conflicts: {}", state.conflicts.len()),
        format!(
            "Last sync: {}",
            state
                .last_sync_at
                .map_or_else(|| "never".to_string(), format_timestamp)
        ),
    ];
    if let Some(error) = &state.error {
        lines.push(format!("Error:     {error}"));
    }
    lines
}
