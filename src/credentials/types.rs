//! Credential error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing credential files.
///
/// These are startup failures and are never retried.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The certificate value is neither an existing file nor valid base64.
    #[error("fugle_cert is not an existing file and not valid base64: {0}")]
    Decode(String),

    /// The value decoded to zero bytes.
    #[error("fugle_cert decoded to an empty certificate")]
    Empty,

    /// Creating, writing or removing a file failed.
    #[error("certificate file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for credential operations.
pub type CertificateResult<T> = Result<T, CertificateError>;
