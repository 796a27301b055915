//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote call (secret store):
//!     → retries.rs (classify failure, decide whether to try again)
//!     → RetryPolicy::delay (exponential delay with jitter between attempts)
//!     → give up after the attempt budget, reporting the attempt count
//! ```
//!
//! # Design Decisions
//! - Only transient failures are retried: network errors, 5xx and 429
//! - Every other status is final on the first attempt
//! - Attempt budget and delays come from `[sync]` settings

pub mod retries;

pub use retries::{is_retryable, retry, RetryFailure, RetryPolicy, Retryable};
