//! Broker SDK configuration file.
//!
//! The trading SDK reads its endpoint, certificate path, API key pair and
//! account from an INI file rather than from arguments, so one is rendered
//! as an owned temp file: next to a decoded certificate, or in the system
//! temp dir when the certificate is the user's own file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::config::schema::ConfigModel;
use crate::credentials::certificate::MaterializedCertificate;
use crate::credentials::types::{CertificateError, CertificateResult};

/// Values the SDK expects in its config file.
#[derive(Clone)]
pub struct FugleSdkConfig {
    pub entry: String,
    pub cert_path: PathBuf,
    pub api_key: String,
    pub api_secret: String,
    pub account: String,
    /// Where [`materialize`](Self::materialize) writes the file.
    pub output_dir: PathBuf,
}

impl std::fmt::Debug for FugleSdkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FugleSdkConfig")
            .field("entry", &self.entry)
            .field("cert_path", &self.cert_path)
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .field("account", &"<REDACTED>")
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl FugleSdkConfig {
    pub fn new(config: &ConfigModel, cert: &MaterializedCertificate) -> Self {
        // Never drop API keys into a directory the user manages.
        let output_dir = cert
            .path()
            .parent()
            .filter(|_| cert.is_owned())
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        Self {
            entry: config.fugle_api_entry().to_string(),
            cert_path: cert.path().to_path_buf(),
            api_key: config.fugle_api_key().to_string(),
            api_secret: config.fugle_api_secret().to_string(),
            account: config.fugle_account().to_string(),
            output_dir,
        }
    }

    /// INI text in the layout the SDK parses. Keys keep their case and no
    /// blank lines are emitted.
    pub fn render(&self) -> String {
        format!(
            "[Core]\nEntry = {}\n[Cert]\nPath = {}\n[Api]\nKey = {}\nSecret = {}\n[User]\nAccount = {}\n",
            self.entry,
            self.cert_path.display(),
            self.api_key,
            self.api_secret,
            self.account,
        )
    }

    pub fn materialize(&self) -> CertificateResult<SdkConfigFile> {
        self.materialize_in(&self.output_dir)
    }

    pub fn materialize_in(&self, dir: &Path) -> CertificateResult<SdkConfigFile> {
        let io_err = |source| CertificateError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix("fugle-config-")
            .suffix(".ini")
            .tempfile_in(dir)
            .map_err(io_err)?;
        file.write_all(self.render().as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;

        let temp = file.into_temp_path();
        tracing::info!(path = %temp.display(), "Wrote SDK config file");
        Ok(SdkConfigFile { temp })
    }
}

/// An owned SDK config file, removed on release or drop.
#[derive(Debug)]
pub struct SdkConfigFile {
    temp: TempPath,
}

impl SdkConfigFile {
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn release(self) -> CertificateResult<()> {
        let path = self.temp.to_path_buf();
        self.temp
            .close()
            .map_err(|source| CertificateError::Io { path, source })
    }
}
