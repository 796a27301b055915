//! Deployment-agnostic endpoint response.
//!
//! # Responsibilities
//! - Carry a status code and a JSON body
//! - Map request-scoped failures to 4xx and handler failures to 5xx
//!
//! # Design Decisions
//! - Error bodies carry a kind and a message, never a stack trace
//! - Coercion errors name the offending parameter

use serde_json::{json, Value};

use crate::endpoint::types::{HandlerExecutionError, ParameterCoercionError, RequestError};

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: Value,
}

impl EndpointResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn bad_parameter(err: &ParameterCoercionError) -> Self {
        Self {
            status: 400,
            body: json!({
                "error": {
                    "kind": "parameter_coercion",
                    "parameter": err.parameter(),
                    "message": err.to_string(),
                }
            }),
        }
    }

    pub fn bad_request(err: &RequestError) -> Self {
        Self {
            status: 400,
            body: json!({
                "error": {
                    "kind": "invalid_request",
                    "message": err.to_string(),
                }
            }),
        }
    }

    pub fn handler_failed(err: &HandlerExecutionError) -> Self {
        Self {
            status: 500,
            body: json!({
                "error": {
                    "kind": "handler_execution",
                    "message": err.to_string(),
                }
            }),
        }
    }

    pub fn timed_out(err: &HandlerExecutionError) -> Self {
        Self {
            status: 504,
            body: json!({
                "error": {
                    "kind": "timeout",
                    "message": err.to_string(),
                }
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
