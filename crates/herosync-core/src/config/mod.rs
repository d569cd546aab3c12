//! Runtime configuration for hosts embedding the sync engine.
//!
//! Loaded from an optional JSON file, then overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::DEFAULT_MAX_RETRIES;
use crate::util::{non_empty, normalize_base_url};

pub const ENV_REMOTE_URL: &str = "HEROSYNC_REMOTE_URL";
pub const ENV_MAX_RETRIES: &str = "HEROSYNC_MAX_RETRIES";
pub const ENV_STORE_PATH: &str = "HEROSYNC_STORE_PATH";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Failed attempts after which a queued change is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base URL of the HTTP remote document store
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Location of the local queue database
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            remote_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            store_path: None,
        }
    }
}

impl SyncConfig {
    /// Read a config file; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => return Err(error.into()),
        };

        serde_json::from_str(&raw).map_err(|error| {
            Error::Config(format!("invalid config file {}: {error}", path.display()))
        })
    }

    /// Load `path`, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HEROSYNC_*` overrides looked up through `lookup`.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = non_empty(lookup(ENV_REMOTE_URL)) {
            self.remote_url = Some(url);
        }
        if let Some(raw) = non_empty(lookup(ENV_MAX_RETRIES)) {
            self.max_retries = raw.parse().map_err(|_| {
                Error::Config(format!("{ENV_MAX_RETRIES} must be a whole number (got '{raw}')"))
            })?;
        }
        if let Some(path) = non_empty(lookup(ENV_STORE_PATH)) {
            self.store_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check value ranges and normalize the remote URL
    pub fn validate(&mut self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.remote_url = match non_empty(self.remote_url.take()) {
            Some(url) => Some(normalize_base_url(&url)?),
            None => None,
        };
        Ok(())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
