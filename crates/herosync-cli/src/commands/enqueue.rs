use std::path::Path;

use herosync_core::{Collection, Operation};

use crate::commands::common::{open_engine, parse_document, read_document_json, short_id};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_enqueue(
    ctx: &CliContext,
    operation: Operation,
    collection: Collection,
    document_id: &str,
    data: Option<String>,
    file: Option<&Path>,
) -> Result<(), CliError> {
    let document = match (operation, read_document_json(data, file)?) {
        (Operation::Delete, _) => None,
        (_, Some(raw)) => Some(parse_document(collection, &raw)?),
        (_, None) => return Err(CliError::MissingData(operation.to_string())),
    };

    let engine = open_engine(ctx).await?;
    let change_id = engine
        .enqueue(operation, collection, document_id, document)
        .await?;
    engine.wait_idle().await;

    let state = engine.state();
    println!(
        "Queued {operation} {collection}/{} ({})",
        document_id.trim(),
        short_id(&change_id.to_string())
    );
    println!("{} pending, {} conflicts", state.pending_changes, state.conflicts.len());
    Ok(())
}
