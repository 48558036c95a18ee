//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::FeedbackConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::fetch::Allowlist;

/// Comma-separated list of hosts the fetcher may contact.
pub const ENV_ALLOWLIST: &str = "API_ALLOWLIST";

/// Overrides `storage.private_base`.
pub const ENV_PRIVATE_BASE: &str = "FEEDBACK_PRIVATE_BASE";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
///
/// With no path, defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<FeedbackConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => FeedbackConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        private_base = %config.storage.private_base.display(),
        allowlist_len = config.fetch.allowlist.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Apply environment overrides through `lookup`.
///
/// An `API_ALLOWLIST` value replaces the file allowlist entirely, even when it
/// parses to no hosts.
pub fn apply_env_overrides<F>(config: &mut FeedbackConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_ALLOWLIST) {
        config.fetch.allowlist = Allowlist::from_csv(&raw).hosts().map(str::to_string).collect();
    }
    if let Some(base) = lookup(ENV_PRIVATE_BASE).filter(|b| !b.trim().is_empty()) {
        config.storage.private_base = PathBuf::from(base);
    }
}
