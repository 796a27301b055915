//! Secret sync subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigModel (repo_synced set)
//!     → flatten.rs (one named entry per field, nested objects as JSON)
//!     → digest.rs (skip entries unchanged since the last upload)
//!     → store.rs (fetch repository public key)
//!     → sealing.rs (sealed box per value)
//!     → store.rs (upsert; optionally list + delete stale secrets)
//!     → digest.rs (record and persist)
//! ```
//!
//! # Design Decisions
//! - Transient store failures retry with backoff, others fail fast
//! - The RNG behind the sealed boxes can be injected for reproducible payloads
//! - `SecretStore` is a trait so tests and other hosts can swap the backend

pub mod digest;
pub mod flatten;
pub mod sealing;
pub mod store;
pub mod syncer;
pub mod types;

pub use digest::{DigestKey, DigestStore};
pub use flatten::{flatten_config, FUNCTION_TARGET_SECRET};
pub use sealing::SecretSealer;
pub use store::{GithubSecretStore, SecretStore};
pub use syncer::SecretSyncer;
pub use types::{RemoteError, RepoPublicKey, SecretEntry, SyncError, SyncReport, SyncResult};
