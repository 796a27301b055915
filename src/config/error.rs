//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::schema::ConfigField;
use crate::config::validation::ValidationError;

/// Errors raised while resolving secrets or loading runtime settings.
///
/// All of them are fatal at startup: they indicate misconfiguration, so
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was found in none of the consulted sources.
    #[error("missing config field `{field}` (looked in {searched})")]
    MissingConfigField { field: ConfigField, searched: String },

    /// A field was present but its value is unusable.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidField { field: ConfigField, reason: String },

    /// No candidate source was given or none is available.
    #[error("no configuration source available: {0}")]
    NoSource(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as a JSON object: {reason}")]
    Json { path: PathBuf, reason: String },

    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("settings validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
