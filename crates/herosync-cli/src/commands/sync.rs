use crate::commands::common::{is_sync_configured, open_engine};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_sync(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    if !is_sync_configured(ctx) {
        return Err(CliError::SyncNotConfigured);
    }

    let engine = open_engine(ctx).await?;
    let summary = engine.sync_now().await;
    let state = engine.state();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match summary {
        None if ctx.offline => println!("Offline; {} changes stay queued", state.pending_changes),
        None => println!("Nothing to sync"),
        Some(summary) => {
            println!(
                "Synced: {} applied, {} conflicted, {} failed",
                summary.applied, summary.conflicted, summary.failed
            );
            if summary.dropped > 0 {
                println!("Dropped {} changes after repeated failures", summary.dropped);
            }
            println!("{} pending", state.pending_changes);
        }
    }
    Ok(())
}
