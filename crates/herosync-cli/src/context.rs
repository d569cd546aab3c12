//! Resolved runtime settings for one CLI invocation.

use std::path::{Path, PathBuf};

use herosync_core::SyncConfig;

use crate::cli::Cli;
use crate::error::CliError;

const APP_DIR_NAME: &str = "herosync";
const CONFIG_FILE_NAME: &str = "config.json";
const STORE_FILE_NAME: &str = "queue.db";

#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: SyncConfig,
    pub store_path: PathBuf,
    pub offline: bool,
}

impl CliContext {
    /// Load the config file and work out where the queue lives.
    ///
    /// `--store-path` beats `store_path` from config or environment, which
    /// beats the platform data directory.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = SyncConfig::load(&config_path)?;
        Self::resolve(config, cli.store_path.clone(), cli.offline)
    }

    pub fn resolve(
        config: SyncConfig,
        store_path: Option<PathBuf>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let store_path = match store_path.or_else(|| config.store_path.clone()) {
            Some(path) => path,
            None => default_store_path()?,
        };
        Ok(Self {
            config,
            store_path,
            offline,
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".to_string()))
}

pub fn default_store_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(STORE_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".to_string()))
}
