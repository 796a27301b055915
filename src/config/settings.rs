//! Runtime settings for the tool itself.
//!
//! These are not secrets: where to look for the secrets file, how the local
//! simulator listens, how hard the syncer retries. All types derive Serde
//! traits for deserialization from a TOML file and every section has
//! defaults, so an absent or empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Where and how the secrets model is resolved.
    pub resolver: ResolverSettings,

    /// Local HTTP simulator.
    pub simulator: SimulatorSettings,

    /// Remote secret synchronization.
    pub sync: SyncSettings,

    /// Observability settings.
    pub observability: ObservabilitySettings,
}

/// Secrets resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Path to the JSON secrets file.
    pub config_path: String,

    /// Prefix prepended to every environment variable name (e.g. "F5_").
    pub env_prefix: Option<String>,

    /// Let environment variables override file values per field.
    pub allow_env_override: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            config_path: ".secrets/index.json".to_string(),
            env_prefix: None,
            allow_env_override: false,
        }
    }
}

/// Local simulator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Bind address (e.g., "127.0.0.1:8080"). Port 0 picks an ephemeral port.
    pub bind_address: String,

    /// Upper bound on a single invocation, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 300,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Secret synchronization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Base URL of the secret store REST API.
    pub api_base: String,

    /// Total attempts per remote call, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,

    /// Skip upserts whose value digest matches the last recorded one.
    pub change_tracking: bool,

    /// Where recorded digests are persisted. In-memory only when unset.
    pub digest_path: Option<String>,

    /// Delete remote secrets that have no local counterpart.
    pub prune_missing: bool,

    /// Endpoint function name, synced as `GCF_FUNCTION_TARGET`.
    pub function_target: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            request_timeout_secs: 10,
            change_tracking: true,
            digest_path: None,
            prune_missing: false,
            function_target: None,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Default filter directive when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "f5_runtime=info,tower_http=info,reqwest=warn,hyper=warn".to_string(),
        }
    }
}
