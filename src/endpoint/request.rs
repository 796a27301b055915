//! Deployment-agnostic endpoint request.
//!
//! # Responsibilities
//! - Hold raw query parameters and an optional JSON body object
//! - Parse a query string and a raw body into that shape
//! - Look up a parameter: body first, then query
//!
//! # Design Decisions
//! - Host runtimes translate their own request types into this at the boundary
//! - A `null` body value counts as not supplied, so query and default still apply

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::endpoint::params::{json_kind, RawParam};
use crate::endpoint::types::RequestError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointRequest {
    query: BTreeMap<String, String>,
    body: Option<Map<String, Value>>,
}

impl EndpointRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Use a JSON value as the body; it must be an object (or null for none).
    pub fn with_json_body(self, body: Value) -> Result<Self, RequestError> {
        match body {
            Value::Object(map) => Ok(self.with_body(map)),
            Value::Null => Ok(self),
            other => Err(RequestError::BodyNotObject(json_kind(&other))),
        }
    }

    /// Parse an URL-encoded query string. Later duplicates win.
    pub fn with_query_string(mut self, query: &str) -> Self {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.query.insert(name.into_owned(), value.into_owned());
        }
        self
    }

    /// Parse a raw body. An empty body means no body.
    pub fn with_raw_body(self, bytes: &[u8]) -> Result<Self, RequestError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(self);
        }
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| RequestError::InvalidJson(e.to_string()))?;
        self.with_json_body(value)
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    /// Raw value for a parameter: JSON body first, then query.
    pub fn lookup(&self, name: &str) -> Option<RawParam<'_>> {
        let from_body = self
            .body
            .as_ref()
            .and_then(|body| body.get(name))
            .filter(|value| !value.is_null())
            .map(RawParam::Json);
        from_body.or_else(|| self.query.get(name).map(|text| RawParam::Text(text)))
    }
}
