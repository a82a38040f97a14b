use std::{env, path::PathBuf};

use thiserror::Error;

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";
/// Environment variable overriding the diagnostic log location.
pub const ERROR_LOG_ENV: &str = "STEWARD_ERROR_LOG";
/// Diagnostic log used when no override is set.
pub const DEFAULT_ERROR_LOG: &str = "errors.log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{TOKEN_ENV} not found in environment variables")]
    MissingToken,
}

/// Runtime settings. Limits and windows are constants, not configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub error_log_path: PathBuf,
}

impl Config {
    /// Load `.env` (if present) and read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup(TOKEN_ENV)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let error_log_path = lookup(ERROR_LOG_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_LOG.to_owned())
            .into();

        Ok(Self {
            token,
            error_log_path,
        })
    }
}
