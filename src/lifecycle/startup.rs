//! Startup orchestration.
//!
//! # Responsibilities
//! - Pick the candidate config sources from settings
//! - Resolve and validate the project config
//! - Materialize the broker certificate and SDK config file
//! - Place sync state beside the secrets file
//!
//! # Design Decisions
//! - Fail fast: a missing field or bad certificate stops startup
//! - The context owns the temporary files; dropping it removes them

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::resolver::{ConfigResolver, ConfigSource, EnvVars, ResolveOptions};
use crate::config::schema::ConfigModel;
use crate::config::settings::{ResolverSettings, RuntimeSettings, SyncSettings};
use crate::config::ConfigError;
use crate::credentials::{
    CertificateError, CertificateMaterializer, FugleSdkConfig, MaterializedCertificate, SdkConfigFile,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),
}

pub type StartupResult<T> = Result<T, StartupError>;

/// Candidate sources in priority order: the JSON file, then the process
/// environment. `config_path` overrides the configured file location.
pub fn config_sources(settings: &ResolverSettings, config_path: Option<&Path>) -> Vec<ConfigSource> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&settings.config_path));

    let mut env = EnvVars::from_process();
    if let Some(prefix) = &settings.env_prefix {
        env = env.with_prefix(prefix.clone());
    }

    vec![ConfigSource::File(path), ConfigSource::Env(env)]
}

/// Digest record kept next to the secrets file when `digest_path` is unset.
pub const DIGEST_FILE_NAME: &str = "sync-digests.json";

/// `[sync]` settings for a run against the secrets file at `config_path`
/// (or `resolver.config_path`). With change tracking on and no explicit
/// `digest_path`, digests persist beside that file so consecutive pre-push
/// runs share them.
pub fn sync_settings(settings: &RuntimeSettings, config_path: Option<&Path>) -> SyncSettings {
    let mut sync = settings.sync.clone();
    if sync.change_tracking && sync.digest_path.is_none() {
        let secrets = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&settings.resolver.config_path));
        let dir = secrets.parent().map(Path::to_path_buf).unwrap_or_default();
        sync.digest_path = Some(dir.join(DIGEST_FILE_NAME).display().to_string());
    }
    sync
}

/// Everything a strategy needs at runtime, built once per process.
#[derive(Debug)]
pub struct ProjectContext {
    config: ConfigModel,
    certificate: MaterializedCertificate,
    sdk_config: SdkConfigFile,
}

impl ProjectContext {
    /// Resolve config from `sources` and prepare credentials.
    pub fn initialize(sources: &[ConfigSource], options: ResolveOptions) -> StartupResult<Self> {
        let config = ConfigResolver::new(options).resolve(sources)?;
        Self::from_config(config)
    }

    /// Prepare credentials for an already resolved config.
    pub fn from_config(config: ConfigModel) -> StartupResult<Self> {
        Self::build(config, CertificateMaterializer::new())
    }

    /// Like [`from_config`](Self::from_config), writing temporary files to `dir`.
    pub fn from_config_in(config: ConfigModel, dir: impl Into<PathBuf>) -> StartupResult<Self> {
        Self::build(config, CertificateMaterializer::in_dir(dir))
    }

    fn build(config: ConfigModel, materializer: CertificateMaterializer) -> StartupResult<Self> {
        let certificate = materializer.materialize(&config)?;
        let sdk_config = FugleSdkConfig::new(&config, &certificate).materialize()?;

        tracing::info!(
            certificate = %certificate.path().display(),
            owned = certificate.is_owned(),
            sdk_config = %sdk_config.path().display(),
            "Project context ready"
        );

        Ok(Self {
            config,
            certificate,
            sdk_config,
        })
    }

    pub fn config(&self) -> &ConfigModel {
        &self.config
    }

    pub fn certificate_path(&self) -> &Path {
        self.certificate.path()
    }

    pub fn certificate_is_owned(&self) -> bool {
        self.certificate.is_owned()
    }

    pub fn sdk_config_path(&self) -> &Path {
        self.sdk_config.path()
    }

    /// Remove temporary files now, reporting failures.
    pub fn release(self) -> StartupResult<ConfigModel> {
        self.sdk_config.release()?;
        self.certificate.release()?;
        tracing::debug!("Temporary credential files removed");
        Ok(self.config)
    }
}
