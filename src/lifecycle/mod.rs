//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Validate → Materialize certificate → Render SDK config
//!     → ProjectContext handed to consumers
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl+C / SIGTERM → broadcast → simulator drains → context released
//!     (temporary credential files removed)
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is retried
//! - No process-wide singleton; the context is passed explicitly
//! - Temporary files are removed on drop as well as on explicit release

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{config_sources, sync_settings, ProjectContext, StartupError, StartupResult};
