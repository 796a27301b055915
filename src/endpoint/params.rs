//! Parameter declarations and coercion.
//!
//! Query parameters arrive as strings and JSON bodies carry loosely typed
//! values, so every declared parameter is coerced to its kind before the
//! user function sees it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::endpoint::types::{HandlerError, ParameterCoercionError};

/// Declared type of an endpoint parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ParamKind::String => "a string",
            ParamKind::Integer => "an integer",
            ParamKind::Float => "a number",
            ParamKind::Boolean => "a boolean",
            ParamKind::List => "a list",
            ParamKind::Object => "an object",
        };
        f.write_str(text)
    }
}

/// A named parameter with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::List)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Object)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The parameter list of an endpoint function.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Function name, also used as the deployment target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Every default must already be a value of its declared kind.
    pub(crate) fn check_defaults(&self) -> Result<(), ParameterCoercionError> {
        for param in &self.params {
            if let Some(default) = &param.default {
                coerce(param, RawParam::Json(default))?;
            }
        }
        Ok(())
    }
}

/// A raw value as found in a request.
#[derive(Debug, Clone, Copy)]
pub enum RawParam<'a> {
    /// From the JSON body.
    Json(&'a Value),
    /// From the query string.
    Text(&'a str),
}

/// Coerce a raw value to the parameter's declared kind.
pub fn coerce(param: &Param, raw: RawParam<'_>) -> Result<Value, ParameterCoercionError> {
    let name = param.name();
    let kind = param.kind();
    match raw {
        RawParam::Text(text) => coerce_text(name, kind, text),
        RawParam::Json(value) => match (kind, value) {
            (_, Value::String(text)) => coerce_text(name, kind, text),
            (ParamKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ParamKind::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (ParamKind::Integer, Value::Number(n)) => number_to_integer(name, n),
            (ParamKind::Float, Value::Number(n)) => Ok(Value::Number(n.clone())),
            (ParamKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (ParamKind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(ParameterCoercionError::invalid(name, kind, format!("`{}` is not 0 or 1", n))),
            },
            (ParamKind::List, Value::Array(_)) | (ParamKind::Object, Value::Object(_)) => Ok(value.clone()),
            (_, other) => Err(ParameterCoercionError::invalid(
                name,
                kind,
                format!("found {}", json_kind(other)),
            )),
        },
    }
}

fn coerce_text(name: &str, kind: ParamKind, text: &str) -> Result<Value, ParameterCoercionError> {
    let trimmed = text.trim();
    match kind {
        ParamKind::String => Ok(Value::String(text.to_string())),
        ParamKind::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ParameterCoercionError::invalid(name, kind, format!("`{}` is not an integer", text))),
        ParamKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| ParameterCoercionError::invalid(name, kind, format!("`{}` is not a number", text))),
        ParamKind::Boolean => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| ParameterCoercionError::invalid(name, kind, format!("`{}` is not a boolean", text))),
        ParamKind::List => {
            if trimmed.starts_with('[') {
                parse_json_text(name, kind, trimmed).and_then(|value| match value {
                    Value::Array(_) => Ok(value),
                    other => Err(ParameterCoercionError::invalid(name, kind, format!("found {}", json_kind(&other)))),
                })
            } else if trimmed.is_empty() {
                Ok(Value::Array(Vec::new()))
            } else {
                // Comma separated, the usual query string spelling.
                Ok(Value::Array(
                    trimmed.split(',').map(|item| Value::String(item.trim().to_string())).collect(),
                ))
            }
        }
        ParamKind::Object => parse_json_text(name, kind, trimmed).and_then(|value| match value {
            Value::Object(_) => Ok(value),
            other => Err(ParameterCoercionError::invalid(name, kind, format!("found {}", json_kind(&other)))),
        }),
    }
}

fn parse_json_text(name: &str, kind: ParamKind, text: &str) -> Result<Value, ParameterCoercionError> {
    serde_json::from_str(text)
        .map_err(|e| ParameterCoercionError::invalid(name, kind, format!("not valid JSON: {}", e)))
}

fn number_to_integer(name: &str, n: &Number) -> Result<Value, ParameterCoercionError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(Value::from(f as i64)),
        _ => Err(ParameterCoercionError::invalid(
            name,
            ParamKind::Integer,
            format!("`{}` is not an integer", n),
        )),
    }
}

/// Common textual spellings of booleans, case-insensitive.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Coerced arguments handed to the user function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Typed access to one argument.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| format!("no argument named `{}`", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| format!("argument `{}` has an unexpected type: {}", name, e).into())
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize all arguments into a struct with matching field names.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}
