use crate::commands::common::open_engine;
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_clear(ctx: &CliContext) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let discarded = engine.queue().await.len();
    engine.clear_queue().await;
    println!("Discarded {discarded} pending changes");
    Ok(())
}
