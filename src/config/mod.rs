//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! secrets file (JSON) or environment variables
//!     → resolver.rs (pick sources, read fields, rebuild nested objects)
//!     → validation.rs (semantic checks)
//!     → ConfigModel (validated, immutable)
//!     → passed explicitly to credentials, endpoint and sync consumers
//!
//! runtime settings (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (range checks, all errors reported)
//!     → RuntimeSettings
//! ```
//!
//! # Design Decisions
//! - The model is immutable once resolved; there is no mutation method
//! - A required field that is missing or empty fails resolution outright
//! - File-vs-environment precedence is an explicit option, not a merge guess
//! - Runtime settings have defaults everywhere so no settings file is needed

pub mod error;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use resolver::{ConfigResolver, ConfigSource, EnvVars, ResolveOptions};
pub use schema::{ConfigField, ConfigModel, RepoTarget};
pub use settings::RuntimeSettings;
