//! Client certificate materialization.
//!
//! The brokerage SDK only accepts a filesystem path for its client
//! certificate, while deployment targets can only carry string secrets. The
//! certificate therefore travels as base64 and is written back to disk at
//! process start.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tempfile::TempPath;

use crate::config::schema::ConfigModel;
use crate::credentials::types::{CertificateError, CertificateResult};

const CERT_PREFIX: &str = "fugle-cert-";
const CERT_SUFFIX: &str = ".p12";

/// A usable certificate path.
///
/// When the file was created by [`CertificateMaterializer`] it is owned and
/// deleted when this value is released or dropped, including during panic
/// unwinding. A path supplied by the user is never touched.
#[derive(Debug)]
pub struct MaterializedCertificate {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl MaterializedCertificate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file was created by this process and will be removed.
    pub fn is_owned(&self) -> bool {
        self.temp.is_some()
    }

    /// Remove the file now if it is owned, reporting removal errors.
    pub fn release(self) -> CertificateResult<()> {
        let Self { path, temp } = self;
        if let Some(temp) = temp {
            temp.close().map_err(|source| CertificateError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "Removed materialized certificate");
        }
        Ok(())
    }
}

/// Produces a filesystem path for the configured client certificate.
#[derive(Debug, Clone, Default)]
pub struct CertificateMaterializer {
    temp_dir: Option<PathBuf>,
}

impl CertificateMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create owned certificate files in `dir` instead of the system temp dir.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
        }
    }

    /// Resolve `fugle_cert` to a path, decoding embedded bytes if needed.
    pub fn materialize(&self, config: &ConfigModel) -> CertificateResult<MaterializedCertificate> {
        let value = config.fugle_cert().trim();

        let supplied = Path::new(value);
        if supplied.is_file() {
            tracing::info!(path = %supplied.display(), "Using certificate file supplied in config");
            return Ok(MaterializedCertificate {
                path: supplied.to_path_buf(),
                temp: None,
            });
        }

        let bytes = decode_certificate(value)?;
        let temp = self.write_temp(&bytes)?;
        let path = temp.to_path_buf();
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Materialized certificate");

        Ok(MaterializedCertificate {
            path,
            temp: Some(temp),
        })
    }

    /// Write bytes to a fresh file with a random name.
    ///
    /// `tempfile` creates the file with owner-only permissions (0600 on unix).
    /// If writing fails the handle is dropped, which removes the partial file.
    fn write_temp(&self, bytes: &[u8]) -> CertificateResult<TempPath> {
        let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        let io_err = |source| CertificateError::Io {
            path: dir.clone(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix(CERT_PREFIX)
            .suffix(CERT_SUFFIX)
            .tempfile_in(&dir)
            .map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;

        Ok(file.into_temp_path())
    }
}

/// Decode an embedded certificate. Line breaks and spaces are tolerated
/// because encoded values are often wrapped when pasted into CI settings.
pub fn decode_certificate(value: &str) -> CertificateResult<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CertificateError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(CertificateError::Empty);
    }
    Ok(bytes)
}

/// Base64 of a certificate file, the form that can be shipped as a secret.
pub fn encode_certificate_file(path: &Path) -> CertificateResult<String> {
    let bytes = fs::read(path).map_err(|source| CertificateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::fixtures::sample_model;

    fn model_with_cert(cert: &str) -> ConfigModel {
        let mut model = sample_model();
        model.fugle_cert = cert.to_string();
        model
    }

    fn residual_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_base64_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bytes: Vec<u8> = (0u8..=255).collect();
        let model = model_with_cert(&STANDARD.encode(&bytes));

        let cert = CertificateMaterializer::in_dir(dir.path()).materialize(&model).unwrap();
        assert!(cert.is_owned());
        assert_eq!(fs::read(cert.path()).unwrap(), bytes);

        let path = cert.path().to_path_buf();
        cert.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_wrapped_base64_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let encoded = STANDARD.encode(b"certificate bytes");
        let wrapped = format!("{}\n{}\n", &encoded[..8], &encoded[8..]);
        let cert = CertificateMaterializer::in_dir(dir.path())
            .materialize(&model_with_cert(&wrapped))
            .unwrap();
        assert_eq!(fs::read(cert.path()).unwrap(), b"certificate bytes");
    }

    #[test]
    fn test_existing_path_is_not_owned() {
        let dir = tempfile::tempdir().unwrap();
        let user_cert = dir.path().join("user.p12");
        fs::write(&user_cert, b"user cert").unwrap();

        let cert = CertificateMaterializer::new()
            .materialize(&model_with_cert(user_cert.to_str().unwrap()))
            .unwrap();
        assert!(!cert.is_owned());
        assert_eq!(cert.path(), user_cert);

        cert.release().unwrap();
        assert!(user_cert.exists());
    }

    #[test]
    fn test_repeated_materialize_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_cert(&STANDARD.encode(b"abc"));
        let materializer = CertificateMaterializer::in_dir(dir.path());

        let first = materializer.materialize(&model).unwrap();
        let second = materializer.materialize(&model).unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(residual_files(dir.path()), 2);

        first.release().unwrap();
        drop(second);
        assert_eq!(residual_files(dir.path()), 0);
    }

    #[test]
    fn test_removed_when_unwinding() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_cert(&STANDARD.encode(b"abc"));
        let materializer = CertificateMaterializer::in_dir(dir.path());

        let result = std::panic::catch_unwind(|| {
            let _cert = materializer.materialize(&model).unwrap();
            panic!("strategy failed");
        });
        assert!(result.is_err());
        assert_eq!(residual_files(dir.path()), 0);
    }

    #[test]
    fn test_invalid_base64_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CertificateMaterializer::in_dir(dir.path())
            .materialize(&model_with_cert("not base64 at all!"))
            .unwrap_err();
        assert!(matches!(err, CertificateError::Decode(_)));
        assert_eq!(residual_files(dir.path()), 0);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let err = CertificateMaterializer::in_dir("/nonexistent/f5-runtime")
            .materialize(&model_with_cert(&STANDARD.encode(b"abc")))
            .unwrap_err();
        assert!(matches!(err, CertificateError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let cert = CertificateMaterializer::in_dir(dir.path())
            .materialize(&model_with_cert(&STANDARD.encode(b"abc")))
            .unwrap();
        let mode = fs::metadata(cert.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_encode_file_matches_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.p12");
        fs::write(&path, b"\x00\x01binary").unwrap();
        let encoded = encode_certificate_file(&path).unwrap();
        assert_eq!(decode_certificate(&encoded).unwrap(), b"\x00\x01binary");
    }
}
