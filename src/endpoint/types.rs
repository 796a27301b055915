//! Endpoint error definitions.

use std::time::Duration;

use thiserror::Error;

use crate::endpoint::params::ParamKind;

/// Error type user functions return. Anything implementing
/// `std::error::Error`, plus plain strings, converts into it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request parameter could not be turned into the declared type.
///
/// Request-scoped: surfaced as a 400 response, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterCoercionError {
    #[error("missing required parameter `{parameter}`")]
    Missing { parameter: String },

    #[error("parameter `{parameter}` expects {expected}: {reason}")]
    Invalid {
        parameter: String,
        expected: ParamKind,
        reason: String,
    },
}

impl ParameterCoercionError {
    pub(crate) fn invalid(parameter: &str, expected: ParamKind, reason: impl Into<String>) -> Self {
        Self::Invalid {
            parameter: parameter.to_string(),
            expected,
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn parameter(&self) -> &str {
        match self {
            Self::Missing { parameter } | Self::Invalid { parameter, .. } => parameter,
        }
    }
}

/// The request itself is malformed, before any parameter is looked at.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("request body must be a JSON object, found {0}")]
    BodyNotObject(&'static str),

    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Failure inside the wrapped user function.
///
/// Surfaced as a 500 response carrying only the message; the full detail
/// goes to the log.
#[derive(Debug, Error)]
pub enum HandlerExecutionError {
    #[error("{0}")]
    Failed(#[source] HandlerError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler result is not JSON-serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("handler did not finish within {}s", .0.as_secs())]
    TimedOut(Duration),
}
