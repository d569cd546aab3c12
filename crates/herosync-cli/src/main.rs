//! herosync CLI - queue character sheet edits offline and sync them later

mod cli;
mod commands;
mod context;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::clear::run_clear;
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::dismiss::run_dismiss;
use crate::commands::enqueue::run_enqueue;
use crate::commands::queue::run_queue;
use crate::commands::resolve::run_resolve;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::context::CliContext;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "herosync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let ctx = CliContext::from_cli(&cli)?;
    match cli.command {
        Commands::Enqueue {
            operation,
            collection,
            id,
            data,
            file,
        } => {
            run_enqueue(
                &ctx,
                operation.into(),
                collection.into(),
                &id,
                data,
                file.as_deref(),
            )
            .await?;
        }
        Commands::Sync { json } => run_sync(&ctx, json).await?,
        Commands::Queue { json } => run_queue(&ctx, json).await?,
        Commands::Clear => run_clear(&ctx).await?,
        Commands::Conflicts { json } => run_conflicts(&ctx, json).await?,
        Commands::Resolve {
            id,
            resolution,
            data,
            file,
        } => {
            run_resolve(&ctx, &id, resolution.into(), data, file.as_deref()).await?;
        }
        Commands::Dismiss { id } => run_dismiss(&ctx, &id).await?,
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
