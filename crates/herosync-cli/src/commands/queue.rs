use crate::commands::common::{format_change_lines, open_engine};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_queue(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let changes = engine.queue().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No pending changes.");
        return Ok(());
    }

    for line in format_change_lines(&changes) {
        println!("{line}");
    }
    Ok(())
}
