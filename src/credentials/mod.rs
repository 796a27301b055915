//! Credential materialization subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigModel.fugle_cert (path or base64)
//!     → certificate.rs (use path as-is, or decode into an owned temp file)
//!     → MaterializedCertificate (path + ownership)
//!     → sdk_config.rs (INI file pointing at the certificate, also owned)
//!     → broker SDK reads both from disk
//! ```
//!
//! # Security Constraints
//! - Owned files are created with random names and owner-only permissions
//! - Owned files are removed exactly once: on release, drop, or unwinding
//! - A failed decode or write leaves no partial file behind
//! - Certificate bytes and passwords are never logged

pub mod certificate;
pub mod sdk_config;
pub mod types;

pub use certificate::{CertificateMaterializer, MaterializedCertificate};
pub use sdk_config::{FugleSdkConfig, SdkConfigFile};
pub use types::{CertificateError, CertificateResult};
