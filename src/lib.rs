//! Runtime adapter layer for trading strategy projects.
//!
//! # Architecture Overview
//!
//! ```text
//!   secrets file / env ──▶ config (ConfigResolver) ──▶ ConfigModel
//!                                                        │
//!                  ┌─────────────────────────────────────┼──────────────────────┐
//!                  ▼                                     ▼                      ▼
//!        credentials                             endpoint                  sync
//!   (certificate + SDK config               (adapt fn → handler)    (sealed secrets →
//!    as owned temp files)                          │                 remote repository)
//!                  │                               ▼
//!                  └──────────▶ lifecycle    simulator (direct call / local axum server)
//!                              (ProjectContext, shutdown)
//!
//!   cross-cutting: observability (tracing, metrics) · resilience (retry, backoff)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use f5_runtime::config::{ConfigResolver, ConfigSource, EnvVars};
//! use f5_runtime::endpoint::{adapt, Arguments, HandlerError, Param, Signature};
//! use f5_runtime::lifecycle::ProjectContext;
//! use f5_runtime::simulator::{LocalSimulator, SimulatorArgs};
//! use clap::Parser;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigResolver::default().resolve(&[
//!     ConfigSource::File(".secrets/index.json".into()),
//!     ConfigSource::Env(EnvVars::from_process()),
//! ])?;
//! let context = ProjectContext::from_config(config)?;
//!
//! let handler = adapt(
//!     Signature::new("create_orders")
//!         .param(Param::boolean("view_only").with_default(true))
//!         .param(Param::integer("fund").with_default(30000)),
//!     |args: Arguments| -> Result<_, HandlerError> {
//!         let fund: i64 = args.get("fund")?;
//!         Ok(serde_json::json!({ "fund": fund }))
//!     },
//! )?;
//!
//! let args = SimulatorArgs::parse();
//! let (params, with_server) = args.apply(serde_json::json!({}), false);
//! LocalSimulator::new(handler, Default::default())
//!     .with_args(&args)?
//!     .run(params, with_server)
//!     .await?;
//! context.release()?;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod simulator;
pub mod sync;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{ConfigModel, ConfigResolver};
pub use endpoint::{adapt, EndpointHandler};
pub use lifecycle::{ProjectContext, Shutdown};
pub use simulator::LocalSimulator;
pub use sync::SecretSyncer;
