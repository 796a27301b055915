//! Secret sync types and error definitions.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::credentials::CertificateError;
use crate::resilience::{is_retryable, Retryable};

/// A failed call to the remote secret store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status, `None` for network errors and timeouts.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "network error: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl Retryable for RemoteError {
    fn is_retryable(&self) -> bool {
        is_retryable(self.status, self.status.is_none())
    }
}

/// Errors that can occur while syncing secrets.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no `repo_synced` target configured")]
    NoTarget,

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Remote {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("repository public key is invalid: {0}")]
    InvalidPublicKey(String),

    #[error("failed to encrypt secret `{name}`")]
    Encryption { name: String },

    #[error("failed to encode certificate for upload: {0}")]
    Certificate(#[from] CertificateError),

    #[error("digest store {path}: {reason}")]
    DigestStore { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl SyncError {
    /// HTTP status of the remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { source, .. } => source.status,
            _ => None,
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// One flattened secret, plaintext until sealed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub name: String,
    pub value: String,
}

impl SecretEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("name", &self.name)
            .field("value", &"<REDACTED>")
            .finish()
    }
}

/// Repository public key as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoPublicKey {
    pub key_id: String,
    /// Base64 of the 32-byte Curve25519 key.
    pub key: String,
}

/// What a sync did, by secret name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upserted: Vec<String>,
    pub skipped: Vec<String>,
    pub deleted: Vec<String>,
}

impl SyncReport {
    pub fn remote_writes(&self) -> usize {
        self.upserted.len() + self.deleted.len()
    }
}
