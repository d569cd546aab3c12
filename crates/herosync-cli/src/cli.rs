use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use herosync_core::{Collection, Operation, Resolution};

#[derive(Parser)]
#[command(name = "herosync")]
#[command(about = "Queue character sheet edits offline and sync them later")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the local queue database
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Treat the host as offline; changes are queued but never sent
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a create, update or delete of a document
    Enqueue {
        #[arg(value_enum)]
        operation: OperationArg,
        #[arg(value_enum)]
        collection: CollectionArg,
        /// Document ID
        id: String,
        /// Document JSON (omit for deletes)
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// Read document JSON from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Push pending changes to the remote store now
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending changes
    #[command(alias = "pending")]
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard every pending change
    Clear,
    /// List unresolved conflicts
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflict
    Resolve {
        /// Conflict ID or unique ID prefix
        id: String,
        #[arg(value_enum)]
        resolution: ResolutionArg,
        /// Merged document JSON (merge only)
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// Read merged document JSON from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Discard a conflict without writing anything
    Dismiss {
        /// Conflict ID or unique ID prefix
        id: String,
    },
    /// Show sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OperationArg {
    Create,
    Update,
    Delete,
}

impl From<OperationArg> for Operation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Create => Self::Create,
            OperationArg::Update => Self::Update,
            OperationArg::Delete => Self::Delete,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CollectionArg {
    #[value(alias = "character")]
    Characters,
    #[value(alias = "prefs")]
    Preferences,
}

impl From<CollectionArg> for Collection {
    fn from(value: CollectionArg) -> Self {
        match value {
            CollectionArg::Characters => Self::Characters,
            CollectionArg::Preferences => Self::Preferences,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ResolutionArg {
    #[value(alias = "local")]
    KeepLocal,
    #[value(alias = "remote")]
    KeepRemote,
    Merge,
}

impl From<ResolutionArg> for Resolution {
    fn from(value: ResolutionArg) -> Self {
        match value {
            ResolutionArg::KeepLocal => Self::KeepLocal,
            ResolutionArg::KeepRemote => Self::KeepRemote,
            ResolutionArg::Merge => Self::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
