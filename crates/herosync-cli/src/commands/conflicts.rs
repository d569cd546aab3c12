use crate::commands::common::{format_conflict_lines, open_engine};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_conflicts(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let conflicts = engine.conflicts().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No unresolved conflicts.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
