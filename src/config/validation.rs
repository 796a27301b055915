//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks on a resolved secrets model (URL shape, repo target)
//! - Range checks on runtime settings (attempts, delays, addresses)
//!
//! # Design Decisions
//! - Settings validation returns all errors, not just the first
//! - Validation is a pure function of its input
//! - Runs before a model or settings value is handed to any subsystem

use std::net::SocketAddr;

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::schema::{ConfigField, ConfigModel};
use crate::config::settings::RuntimeSettings;

/// A single semantic problem with the runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a freshly assembled model before it is released to callers.
pub fn validate_model(model: &ConfigModel) -> ConfigResult<()> {
    let entry = url::Url::parse(model.fugle_api_entry()).map_err(|e| ConfigError::InvalidField {
        field: ConfigField::FugleApiEntry,
        reason: format!("not a valid URL: {}", e),
    })?;
    if !matches!(entry.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            field: ConfigField::FugleApiEntry,
            reason: format!("unsupported scheme `{}`", entry.scheme()),
        });
    }

    if !model.gcf_service_account().is_object() {
        return Err(ConfigError::InvalidField {
            field: ConfigField::GcfServiceAccount,
            reason: "must be a JSON object".to_string(),
        });
    }

    if let Some(target) = model.repo_synced() {
        for (name, value) in [("owner", &target.owner), ("repo", &target.repo), ("pat", &target.pat)] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    field: ConfigField::RepoSynced,
                    reason: format!("`{}` must not be empty", name),
                });
            }
        }
    }

    Ok(())
}

/// Check runtime settings, collecting every problem.
pub fn validate_settings(settings: &RuntimeSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.resolver.config_path.trim().is_empty() {
        errors.push(ValidationError::new("resolver.config_path", "must not be empty"));
    }

    if settings.simulator.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "simulator.bind_address",
            format!("`{}` is not a socket address", settings.simulator.bind_address),
        ));
    }
    if settings.simulator.request_timeout_secs == 0 {
        errors.push(ValidationError::new("simulator.request_timeout_secs", "must be greater than 0"));
    }
    if settings.simulator.max_body_bytes == 0 {
        errors.push(ValidationError::new("simulator.max_body_bytes", "must be greater than 0"));
    }

    let sync = &settings.sync;
    if url::Url::parse(&sync.api_base).is_err() {
        errors.push(ValidationError::new(
            "sync.api_base",
            format!("`{}` is not a valid URL", sync.api_base),
        ));
    }
    if sync.max_attempts == 0 {
        errors.push(ValidationError::new("sync.max_attempts", "must be at least 1"));
    }
    if sync.max_attempts > 10 {
        errors.push(ValidationError::new("sync.max_attempts", "must be at most 10"));
    }
    if sync.base_delay_ms > sync.max_delay_ms {
        errors.push(ValidationError::new(
            "sync.base_delay_ms",
            "must not exceed sync.max_delay_ms",
        ));
    }
    if sync.request_timeout_secs == 0 {
        errors.push(ValidationError::new("sync.request_timeout_secs", "must be greater than 0"));
    }
    if let Some(target) = &sync.function_target {
        if target.trim().is_empty() {
            errors.push(ValidationError::new("sync.function_target", "must not be empty when set"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
