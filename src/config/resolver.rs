//! Secrets resolution from a JSON file or environment variables.
//!
//! # Policy
//! - Sources are given in priority order.
//! - By default the first *available* source supplies every field: a file
//!   source is available when the file exists, an environment source always is.
//! - With `allow_env_override`, each field is looked up in environment sources
//!   first and file sources second, so env values override the file per field.
//! - A required field found nowhere (or found empty) fails resolution.
//! - Sources are only read, never written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::schema::{ConfigField, ConfigModel, RepoTarget};
use crate::config::validation::validate_model;

/// Snapshot of an environment namespace.
///
/// Resolution reads from a snapshot instead of the live process environment
/// so the same code path can be exercised with an explicit map.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
    prefix: Option<String>,
}

impl EnvVars {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Only consider variables named `<prefix><FIELD>`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Full variable name for a field, including the prefix.
    pub fn var_name(&self, field: ConfigField) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, field.env_name()),
            None => field.env_name(),
        }
    }

    pub fn get(&self, field: ConfigField) -> Option<&str> {
        self.vars.get(&self.var_name(field)).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            prefix: None,
        }
    }
}

/// A candidate source of secrets.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// JSON object file; keys match field names case-insensitively.
    File(PathBuf),
    /// Upper-snake-case environment variables.
    Env(EnvVars),
}

impl ConfigSource {
    fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => format!("file `{}`", path.display()),
            ConfigSource::Env(env) => match &env.prefix {
                Some(prefix) => format!("environment (prefix `{}`)", prefix),
                None => "environment".to_string(),
            },
        }
    }
}

/// Resolution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Let environment sources override file sources per field.
    pub allow_env_override: bool,
}

/// Builds a [`ConfigModel`] from candidate sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    options: ResolveOptions,
}

/// A source after it has been read.
enum Loaded {
    File { path: PathBuf, values: Map<String, Value> },
    Env(EnvVars),
}

/// A raw field value together with the source it came from.
enum RawValue<'a> {
    Json { value: &'a Value, base_dir: Option<&'a Path> },
    Text(&'a str),
}

impl ConfigResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Resolve a complete model from the given candidates.
    pub fn resolve(&self, candidates: &[ConfigSource]) -> ConfigResult<ConfigModel> {
        if candidates.is_empty() {
            return Err(ConfigError::NoSource("no candidate sources given".to_string()));
        }

        let consulted = self.load_sources(candidates)?;
        let searched = consulted
            .iter()
            .map(|(desc, _)| desc.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let loaded: Vec<&Loaded> = consulted.iter().map(|(_, l)| l).collect();

        for (desc, _) in &consulted {
            tracing::info!(source = %desc, "Resolving project config");
        }

        let text = |field: ConfigField| -> ConfigResult<String> {
            let value = match self.lookup(&loaded, field) {
                Some(raw) => text_value(field, raw)?,
                None => String::new(),
            };
            if value.trim().is_empty() {
                return Err(ConfigError::MissingConfigField {
                    field,
                    searched: searched.clone(),
                });
            }
            Ok(value)
        };

        let model = ConfigModel {
            finlab_api_token: text(ConfigField::FinlabApiToken)?,
            fugle_account: text(ConfigField::FugleAccount)?,
            fugle_password: text(ConfigField::FuglePassword)?,
            fugle_cert: self.cert_value(&loaded, text(ConfigField::FugleCert)?),
            fugle_cert_password: text(ConfigField::FugleCertPassword)?,
            fugle_api_entry: text(ConfigField::FugleApiEntry)?,
            fugle_api_key: text(ConfigField::FugleApiKey)?,
            fugle_api_secret: text(ConfigField::FugleApiSecret)?,
            fugle_market_api_key: text(ConfigField::FugleMarketApiKey)?,
            gcf_service_account: self.service_account(&loaded, &searched)?,
            repo_synced: self.repo_target(&loaded)?,
        };

        validate_model(&model)?;

        tracing::info!(
            repo_synced = model.repo_synced().map(RepoTarget::slug).as_deref().unwrap_or("none"),
            "Project config resolved"
        );
        Ok(model)
    }

    /// Read the sources that take part in resolution.
    fn load_sources(&self, candidates: &[ConfigSource]) -> ConfigResult<Vec<(String, Loaded)>> {
        let mut consulted = Vec::new();
        for candidate in candidates {
            let loaded = match candidate {
                ConfigSource::File(path) => {
                    if !path.exists() {
                        tracing::debug!(path = %path.display(), "Config file not found, skipping");
                        continue;
                    }
                    Loaded::File {
                        path: path.clone(),
                        values: read_json_object(path)?,
                    }
                }
                ConfigSource::Env(env) => Loaded::Env(env.clone()),
            };
            consulted.push((candidate.describe(), loaded));
            if !self.options.allow_env_override {
                break;
            }
        }

        if consulted.is_empty() {
            let described = candidates.iter().map(ConfigSource::describe).collect::<Vec<_>>();
            return Err(ConfigError::NoSource(described.join(", ")));
        }
        Ok(consulted)
    }

    /// Find the raw value for a field. Environment sources are searched
    /// before file sources when overriding is allowed.
    fn lookup<'a>(&self, loaded: &[&'a Loaded], field: ConfigField) -> Option<RawValue<'a>> {
        let from = |source: &'a Loaded| -> Option<RawValue<'a>> {
            match source {
                Loaded::File { path, values } => values.get(field.key()).map(|value| RawValue::Json {
                    value,
                    base_dir: path.parent(),
                }),
                Loaded::Env(env) => env.get(field).map(RawValue::Text),
            }
        };

        if self.options.allow_env_override {
            let env_first = loaded
                .iter()
                .filter(|l| matches!(l, Loaded::Env(_)))
                .chain(loaded.iter().filter(|l| matches!(l, Loaded::File { .. })));
            for source in env_first {
                if let Some(raw) = from(*source) {
                    return Some(raw);
                }
            }
            None
        } else {
            loaded.iter().find_map(|source| from(*source))
        }
    }

    /// Relative certificate paths in a config file are relative to the file.
    fn cert_value(&self, loaded: &[&Loaded], value: String) -> String {
        let Some(RawValue::Json { base_dir: Some(base_dir), .. }) = self.lookup(loaded, ConfigField::FugleCert) else {
            return value;
        };
        let candidate = Path::new(&value);
        if candidate.is_relative() {
            let joined = base_dir.join(candidate);
            if joined.is_file() {
                return joined.to_string_lossy().into_owned();
            }
        }
        value
    }

    fn service_account(&self, loaded: &[&Loaded], searched: &str) -> ConfigResult<Value> {
        let field = ConfigField::GcfServiceAccount;
        let missing = || ConfigError::MissingConfigField {
            field,
            searched: searched.to_string(),
        };
        let value = self
            .lookup(loaded, field)
            .map(|raw| json_value(field, raw))
            .transpose()?
            .ok_or_else(|| missing())?;
        match &value {
            Value::Object(map) if !map.is_empty() => Ok(value),
            Value::Object(_) | Value::Null => Err(missing()),
            _ => Err(ConfigError::InvalidField {
                field,
                reason: "expected a JSON object".to_string(),
            }),
        }
    }

    fn repo_target(&self, loaded: &[&Loaded]) -> ConfigResult<Option<RepoTarget>> {
        let field = ConfigField::RepoSynced;
        let value = match self.lookup(loaded, field) {
            Some(raw) => json_value(field, raw)?,
            None => return Ok(None),
        };
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidField {
                field,
                reason: format!("expected {{owner, repo, pat}}: {}", e),
            })
    }
}

/// Read a JSON object file, normalizing keys to lower snake case.
fn read_json_object(path: &Path) -> ConfigResult<Map<String, Value>> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Json {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (normalize_key(&key), value))
            .collect()),
        other => Err(ConfigError::Json {
            path: path.to_path_buf(),
            reason: format!("top level is {}, not an object", json_kind(&other)),
        }),
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

fn text_value(field: ConfigField, raw: RawValue<'_>) -> ConfigResult<String> {
    match raw {
        RawValue::Text(text) => Ok(text.to_string()),
        RawValue::Json { value, .. } => match value {
            Value::String(s) => Ok(s.clone()),
            // Account numbers are often written unquoted.
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(ConfigError::InvalidField {
                field,
                reason: format!("expected a string, found {}", json_kind(other)),
            }),
        },
    }
}

/// Nested objects arrive as objects from files and as JSON text from env vars.
fn json_value(field: ConfigField, raw: RawValue<'_>) -> ConfigResult<Value> {
    let parse = |text: &str| -> ConfigResult<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidField {
            field,
            reason: format!("not valid JSON: {}", e),
        })
    };
    match raw {
        RawValue::Text(text) => parse(text),
        RawValue::Json { value: Value::String(text), .. } => parse(text),
        RawValue::Json { value, .. } => Ok(value.clone()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
