//! Local simulator subsystem.
//!
//! # Data Flow
//! ```text
//! direct mode:  params → EndpointRequest (body) → EndpointHandler → log + return
//!
//! server mode:  TcpListener → server.rs (axum, middleware, one request at a time)
//!                   → EndpointRequest → handler on the blocking pool
//!                   → EndpointResponse → JSON response
//!               runner.rs sends the params once as a simulated request,
//!               then serves until Ctrl+C
//! ```

pub mod runner;
pub mod server;

pub use runner::{LocalSimulator, SimulatorArgs, SimulatorError, SimulatorResult};
pub use server::SimulatorServer;
