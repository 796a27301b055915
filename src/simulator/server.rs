//! Local HTTP server in front of an endpoint handler.
//!
//! # Responsibilities
//! - Accept any method on any path and hand it to the handler
//! - Translate axum requests into `EndpointRequest` and back
//! - Wire up middleware (tracing, request ID, body limit)
//! - Serve one request at a time, running the handler off the async runtime
//!
//! # Design Decisions
//! - The single-flight guard moves into the blocking task, so it is held
//!   until the user function returns even if the client has given up
//! - A request that exceeds the timeout (waiting included) gets a JSON 504

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::settings::SimulatorSettings;
use crate::endpoint::{EndpointHandler, EndpointRequest, EndpointResponse, HandlerExecutionError, RequestError};

#[derive(Clone)]
struct AppState {
    handler: EndpointHandler,
    max_body_bytes: usize,
    request_timeout: Duration,
    /// Held by whichever invocation is running.
    in_flight: Arc<Mutex<()>>,
}

/// UUID v4 request IDs for `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub struct SimulatorServer {
    router: Router,
    endpoint: String,
}

impl SimulatorServer {
    pub fn new(handler: EndpointHandler, settings: &SimulatorSettings) -> Self {
        let endpoint = handler.name().to_string();
        let state = AppState {
            handler,
            max_body_bytes: settings.max_body_bytes,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            in_flight: Arc::new(Mutex::new(())),
        };
        Self {
            router: Self::build_router(settings, state),
            endpoint,
        }
    }

    fn build_router(settings: &SimulatorSettings, state: AppState) -> Router {
        Router::new()
            .fallback(endpoint_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, endpoint = %self.endpoint, "Local simulator listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Local simulator stopped");
        Ok(())
    }
}

async fn endpoint_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let query = request.uri().query().unwrap_or_default().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Simulating endpoint request"
    );

    let bytes = match axum::body::to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Only the size limit makes a body unreadable while the client is still there.
            let err = RequestError::Body(e.to_string());
            tracing::warn!(request_id = %request_id, error = %err, "Rejected request");
            let mut response = EndpointResponse::bad_request(&err);
            response.status = StatusCode::PAYLOAD_TOO_LARGE.as_u16();
            return into_response(response);
        }
    };

    let endpoint_request = match EndpointRequest::new().with_query_string(&query).with_raw_body(&bytes) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(request_id = %request_id, error = %err, "Rejected request");
            return into_response(EndpointResponse::bad_request(&err));
        }
    };

    let response = match tokio::time::timeout(state.request_timeout, run_exclusive(&state, endpoint_request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Handler task did not complete");
            EndpointResponse::handler_failed(&HandlerExecutionError::Panicked(e.to_string()))
        }
        Err(_) => {
            let err = HandlerExecutionError::TimedOut(state.request_timeout);
            tracing::warn!(request_id = %request_id, error = %err, "Request timed out");
            EndpointResponse::timed_out(&err)
        }
    };

    tracing::info!(request_id = %request_id, status = response.status, "Endpoint responded");
    into_response(response)
}

/// Wait for the single-flight guard, then run the handler on the blocking
/// pool. The guard is released only when the handler returns.
async fn run_exclusive(
    state: &AppState,
    request: EndpointRequest,
) -> Result<EndpointResponse, tokio::task::JoinError> {
    let guard = state.in_flight.clone().lock_owned().await;
    let handler = state.handler.clone();
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        handler.handle(&request)
    })
    .await
}

fn into_response(response: EndpointResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
