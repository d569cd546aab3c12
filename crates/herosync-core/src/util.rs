//! Small helpers shared by configuration and the remote adapters.

use crate::error::{Error, Result};

/// Trim a value and drop it when nothing is left.
pub fn non_empty(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Validate an `http(s)` base URL and strip trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::Config("remote URL must not be empty".to_string()));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(Error::Config(format!(
            "remote URL must include http:// or https:// (got '{}')",
            compact_text(value)
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}
