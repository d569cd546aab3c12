use crate::commands::common::{open_engine, resolve_conflict_id, short_id};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_dismiss(ctx: &CliContext, conflict_query: &str) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let conflict_id = resolve_conflict_id(conflict_query, &engine.conflicts().await)?;

    if !engine.dismiss_conflict(conflict_id).await {
        return Err(CliError::ConflictNotFound(conflict_query.to_string()));
    }
    println!("Dismissed conflict {}", short_id(&conflict_id.to_string()));
    Ok(())
}
