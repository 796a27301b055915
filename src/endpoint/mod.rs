//! Endpoint adapter subsystem.
//!
//! # Data Flow
//! ```text
//! host request (direct call / local HTTP / serverless trigger)
//!     → [boundary translation, owned by the host]
//!     → request.rs (EndpointRequest: query + optional JSON body)
//!     → params.rs (look up body → query → default, coerce to declared kind)
//!     → adapter.rs (invoke user function, contain failures)
//!     → response.rs (EndpointResponse: status + JSON body)
//! ```
//!
//! # Design Decisions
//! - `adapt` returns a value; nothing is registered globally
//! - Bad parameters are 400s naming the parameter, user failures are 500s
//! - Failures never propagate to the caller of the handler

pub mod adapter;
pub mod params;
pub mod request;
pub mod response;
pub mod types;

pub use adapter::{adapt, EndpointHandler};
pub use params::{Arguments, Param, ParamKind, Signature};
pub use request::EndpointRequest;
pub use response::EndpointResponse;
pub use types::{HandlerError, HandlerExecutionError, ParameterCoercionError, RequestError};
