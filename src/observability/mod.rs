//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint, simulator, sync, CLI:
//!     → logging.rs (tracing subscriber, env-filter controlled)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured default filter
//! - Secrets never reach either sink; config types redact their `Debug`
//! - Metrics go to whatever recorder the host installs; none is installed here

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
