use crate::commands::common::{format_status_lines, open_engine, StatusItem};
use crate::context::CliContext;
use crate::error::CliError;

pub async fn run_status(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let engine = open_engine(ctx).await?;
    let state = engine.state();

    if as_json {
        let item = StatusItem {
            status: state.status(),
            state,
        };
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    for line in format_status_lines(&state) {
        println!("{line}");
    }
    Ok(())
}
