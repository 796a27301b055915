//! Turns a plain function into a request handler.

use std::error::Error as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::endpoint::params::{coerce, Arguments, Signature};
use crate::endpoint::request::EndpointRequest;
use crate::endpoint::response::EndpointResponse;
use crate::endpoint::types::{HandlerError, HandlerExecutionError, ParameterCoercionError};
use crate::observability::metrics;

type BoxedFn = dyn Fn(Arguments) -> Result<Value, HandlerExecutionError> + Send + Sync;

/// A user function bound to its signature.
///
/// Cheap to clone and safe to share between threads. The same value serves
/// direct calls, the local simulator and a deployed trigger.
#[derive(Clone)]
pub struct EndpointHandler {
    signature: Arc<Signature>,
    func: Arc<BoxedFn>,
}

impl std::fmt::Debug for EndpointHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHandler")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Wrap `func` as an endpoint with the given signature.
///
/// Fails if a declared default is not a value of its parameter's kind.
///
/// ```no_run
/// use f5_runtime::endpoint::{adapt, EndpointRequest, Param, Signature};
///
/// let handler = adapt(
///     Signature::new("create_orders")
///         .param(Param::boolean("view_only").with_default(true))
///         .param(Param::integer("fund").with_default(30000)),
///     |args| -> Result<_, f5_runtime::endpoint::HandlerError> {
///         let fund: i64 = args.get("fund")?;
///         Ok(vec![serde_json::json!({"fund": fund})])
///     },
/// )
/// .unwrap();
/// let response = handler.handle(&EndpointRequest::new().with_query("fund", "10000"));
/// assert_eq!(response.status, 200);
/// ```
pub fn adapt<F, T, E>(signature: Signature, func: F) -> Result<EndpointHandler, ParameterCoercionError>
where
    F: Fn(Arguments) -> Result<T, E> + Send + Sync + 'static,
    T: Serialize,
    E: Into<HandlerError>,
{
    signature.check_defaults()?;
    tracing::info!(
        endpoint = %signature.name(),
        params = signature.params().len(),
        "Registered endpoint"
    );

    let func = move |args: Arguments| -> Result<Value, HandlerExecutionError> {
        let output = func(args).map_err(|e| HandlerExecutionError::Failed(e.into()))?;
        Ok(serde_json::to_value(output)?)
    };

    Ok(EndpointHandler {
        signature: Arc::new(signature),
        func: Arc::new(func),
    })
}

impl EndpointHandler {
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Resolve every parameter: body, then query, then default.
    pub fn bind(&self, request: &EndpointRequest) -> Result<Arguments, ParameterCoercionError> {
        let mut values = Map::new();
        for param in self.signature.params() {
            let value = match request.lookup(param.name()) {
                Some(raw) => coerce(param, raw)?,
                None => match param.default() {
                    Some(default) => default.clone(),
                    None => {
                        return Err(ParameterCoercionError::Missing {
                            parameter: param.name().to_string(),
                        })
                    }
                },
            };
            values.insert(param.name().to_string(), value);
        }
        Ok(Arguments::new(values))
    }

    /// Run the function for one request. Never panics and never returns an
    /// error: every failure becomes a response.
    pub fn handle(&self, request: &EndpointRequest) -> EndpointResponse {
        let start = Instant::now();
        let name = self.name();

        let response = match self.bind(request) {
            Err(err) => {
                tracing::warn!(endpoint = %name, parameter = %err.parameter(), error = %err, "Rejected request");
                EndpointResponse::bad_parameter(&err)
            }
            Ok(args) => {
                tracing::debug!(endpoint = %name, args = ?args.as_map(), "Invoking endpoint");
                match self.invoke(args) {
                    Ok(body) => EndpointResponse::ok(body),
                    Err(err) => {
                        tracing::error!(
                            endpoint = %name,
                            error = %err,
                            detail = %error_detail(&err),
                            "Endpoint handler failed"
                        );
                        EndpointResponse::handler_failed(&err)
                    }
                }
            }
        };

        metrics::record_endpoint_request(name, response.status, start);
        response
    }

    fn invoke(&self, args: Arguments) -> Result<Value, HandlerExecutionError> {
        match catch_unwind(AssertUnwindSafe(|| (self.func)(args))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                Err(HandlerExecutionError::Panicked(message))
            }
        }
    }
}

/// Debug form plus the full source chain, for the log sink only.
fn error_detail(err: &HandlerExecutionError) -> String {
    let mut detail = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(&format!("; caused by: {}", cause));
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::params::Param;
    use serde_json::json;
    use std::sync::Mutex;

    fn orders_signature() -> Signature {
        Signature::new("create_orders")
            .param(Param::boolean("view_only").with_default(true))
            .param(Param::integer("fund").with_default(30000))
    }

    #[test]
    fn test_query_value_coerced_and_default_applied() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let handler = adapt(orders_signature(), move |args: Arguments| -> Result<Value, HandlerError> {
            let view_only: bool = args.get("view_only")?;
            let fund: i64 = args.get("fund")?;
            *captured.lock().unwrap() = Some((view_only, fund));
            Ok(json!([{"stock_id": "2330", "quantity": 1}]))
        })
        .unwrap();

        let response = handler.handle(&EndpointRequest::new().with_query("fund", "10000"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body[0]["stock_id"], "2330");
        assert_eq!(*seen.lock().unwrap(), Some((true, 10000)));
    }

    #[test]
    fn test_non_numeric_value_is_400_naming_parameter() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let handler = adapt(orders_signature(), move |_args: Arguments| -> Result<Value, HandlerError> {
            *flag.lock().unwrap() = true;
            Ok(Value::Null)
        })
        .unwrap();

        let response = handler.handle(&EndpointRequest::new().with_query("fund", "abc"));
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"]["parameter"], "fund");
        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn test_missing_required_parameter() {
        let handler = adapt(
            Signature::new("f").param(Param::string("symbol")),
            |_args: Arguments| -> Result<Value, HandlerError> { Ok(Value::Null) },
        )
        .unwrap();
        let response = handler.handle(&EndpointRequest::new());
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"]["parameter"], "symbol");
    }

    #[test]
    fn test_failure_is_500_with_message_only() {
        let handler = adapt(orders_signature(), |_args: Arguments| -> Result<Value, HandlerError> {
            Err("broker session expired".into())
        })
        .unwrap();
        let response = handler.handle(&EndpointRequest::new());
        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"]["message"], "broker session expired");
        assert!(response.body["error"].get("backtrace").is_none());
    }

    /// Log sink for asserting on formatted events.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct BrokerDown;

    impl std::fmt::Display for BrokerDown {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "socket closed by broker")
        }
    }

    impl std::error::Error for BrokerDown {}

    #[derive(Debug)]
    struct OrderRejected(BrokerDown);

    impl std::fmt::Display for OrderRejected {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "order submission failed")
        }
    }

    impl std::error::Error for OrderRejected {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_failure_cause_chain_is_logged_not_returned() {
        let handler = adapt(orders_signature(), |_args: Arguments| -> Result<Value, OrderRejected> {
            Err(OrderRejected(BrokerDown))
        })
        .unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let response = tracing::subscriber::with_default(subscriber, || handler.handle(&EndpointRequest::new()));

        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"]["message"], "order submission failed");
        assert!(!response.body.to_string().contains("socket closed by broker"));

        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("Endpoint handler failed"));
        assert!(logged.contains("caused by: socket closed by broker"), "log was: {logged}");
    }

    #[test]
    fn test_panic_is_contained() {
        let handler = adapt(orders_signature(), |_args: Arguments| -> Result<Value, HandlerError> {
            panic!("strategy bug");
        })
        .unwrap();
        let response = handler.handle(&EndpointRequest::new());
        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"]["message"], "handler panicked: strategy bug");

        // Still serving afterwards.
        assert_eq!(handler.handle(&EndpointRequest::new()).status, 500);
    }

    #[test]
    fn test_body_json_values() {
        let handler = adapt(orders_signature(), |args: Arguments| -> Result<Value, HandlerError> {
            Ok(Value::Object(args.as_map().clone()))
        })
        .unwrap();
        let request = EndpointRequest::new()
            .with_json_body(json!({"view_only": "false", "fund": 5000, "extra": 1}))
            .unwrap();
        let response = handler.handle(&request);
        assert_eq!(response.body, json!({"view_only": false, "fund": 5000}));
    }

    #[test]
    fn test_bad_default_rejected_at_adapt() {
        let err = adapt(
            Signature::new("f").param(Param::boolean("view_only").with_default("sometimes")),
            |_args: Arguments| -> Result<Value, HandlerError> { Ok(Value::Null) },
        )
        .unwrap_err();
        assert_eq!(err.parameter(), "view_only");
    }
}
