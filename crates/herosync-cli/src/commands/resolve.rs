use std::path::Path;

use herosync_core::Resolution;

use crate::commands::common::{
    open_engine, parse_document, read_document_json, resolve_conflict_id, short_id,
};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_resolve(
    ctx: &CliContext,
    conflict_query: &str,
    resolution: Resolution,
    data: Option<String>,
    file: Option<&Path>,
) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let conflicts = engine.conflicts().await;
    let conflict_id = resolve_conflict_id(conflict_query, &conflicts)?;

    let merged = match (resolution, read_document_json(data, file)?) {
        (Resolution::Merge, Some(raw)) => {
            let collection = conflicts
                .iter()
                .find(|conflict| conflict.id == conflict_id)
                .map(|conflict| conflict.collection)
                .ok_or_else(|| CliError::ConflictNotFound(conflict_query.to_string()))?;
            Some(parse_document(collection, &raw)?)
        }
        (Resolution::Merge, None) => return Err(CliError::MissingData("merge".to_string())),
        (_, _) => None,
    };

    let short = short_id(&conflict_id.to_string());
    if !engine
        .resolve_conflict(conflict_id, resolution, merged)
        .await
    {
        return Err(CliError::ResolutionRejected(short));
    }
    engine.wait_idle().await;

    println!(
        "Resolved conflict {short}; {} pending",
        engine.state().pending_changes
    );
    Ok(())
}
