//! Running an endpoint locally.
//!
//! Either calls the handler in-process with the given params as the request
//! body, or starts the local server, sends the params once as a simulated
//! request, and keeps serving until interrupted.

use std::future::Future;
use std::net::SocketAddr;

use clap::Parser;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::settings::SimulatorSettings;
use crate::endpoint::{EndpointHandler, EndpointRequest, EndpointResponse, RequestError};
use crate::lifecycle::shutdown_signal;
use crate::simulator::server::SimulatorServer;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("invalid bind address `{address}`: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid params: {0}")]
    Params(#[from] RequestError),

    #[error("server task failed: {0}")]
    Task(String),
}

pub type SimulatorResult<T> = Result<T, SimulatorError>;

/// Command-line overrides for a local run.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "simulate", about = "Run the endpoint locally")]
pub struct SimulatorArgs {
    /// Call the handler directly instead of through a local server
    #[arg(short = 'd', long, conflicts_with = "serve")]
    pub directly: bool,

    /// Request params as a JSON object
    #[arg(short = 'p', long, value_parser = parse_params)]
    pub params: Option<Value>,

    /// Serve over HTTP until interrupted
    #[arg(long)]
    pub serve: bool,

    /// Port for the local server (0 picks a free one)
    #[arg(long)]
    pub port: Option<u16>,
}

fn parse_params(raw: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("params must be a JSON object".to_string())
    }
}

impl SimulatorArgs {
    /// Params and mode after applying these overrides to the given ones.
    pub fn apply(&self, params: Value, with_server: bool) -> (Value, bool) {
        let params = self.params.clone().unwrap_or(params);
        let with_server = if self.directly {
            false
        } else {
            self.serve || with_server
        };
        (params, with_server)
    }
}

pub struct LocalSimulator {
    handler: EndpointHandler,
    settings: SimulatorSettings,
}

impl LocalSimulator {
    pub fn new(handler: EndpointHandler, settings: SimulatorSettings) -> Self {
        Self { handler, settings }
    }

    /// Apply `args` overrides to the settings (currently the port).
    pub fn with_args(mut self, args: &SimulatorArgs) -> SimulatorResult<Self> {
        if let Some(port) = args.port {
            let mut addr = self.bind_address()?;
            addr.set_port(port);
            self.settings.bind_address = addr.to_string();
        }
        Ok(self)
    }

    fn bind_address(&self) -> SimulatorResult<SocketAddr> {
        self.settings
            .bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| SimulatorError::Address {
                address: self.settings.bind_address.clone(),
                reason: e.to_string(),
            })
    }

    /// Invoke the handler in-process with `params` as the JSON body.
    pub fn call_directly(&self, params: Value) -> SimulatorResult<EndpointResponse> {
        let request = EndpointRequest::new().with_json_body(params)?;
        tracing::info!(endpoint = %self.handler.name(), "Calling endpoint directly");
        let response = self.handler.handle(&request);
        log_response(&response);
        Ok(response)
    }

    /// Run until Ctrl+C in server mode, or once in direct mode.
    ///
    /// Returns the direct call's response, or in server mode the response
    /// to the initial simulated request when it completed.
    pub async fn run(&self, params: Value, with_server: bool) -> SimulatorResult<Option<EndpointResponse>> {
        self.run_until(params, with_server, shutdown_signal()).await
    }

    /// [`run`](Self::run) with a caller-controlled shutdown trigger.
    pub async fn run_until<F>(
        &self,
        params: Value,
        with_server: bool,
        shutdown: F,
    ) -> SimulatorResult<Option<EndpointResponse>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !with_server {
            return self.call_directly(params).map(Some);
        }

        let address = self.bind_address()?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| SimulatorError::Bind { address, source })?;
        let local = listener.local_addr()?;

        let server = SimulatorServer::new(self.handler.clone(), &self.settings);
        let serving = tokio::spawn(server.run(listener, shutdown));

        let first = simulate_request(local, &params).await;

        serving
            .await
            .map_err(|e| SimulatorError::Task(e.to_string()))??;
        Ok(first)
    }
}

/// POST `params` to the local server once, the way a trigger would.
async fn simulate_request(address: SocketAddr, params: &Value) -> Option<EndpointResponse> {
    let url = format!("http://{}/", address);
    tracing::info!(url = %url, "Sending simulated request");

    let body = match params {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    // Loopback only; an HTTP_PROXY in the environment must not intercept it.
    let client = match reqwest::Client::builder().no_proxy().build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Could not build simulated request client");
            return None;
        }
    };
    let sent = client.post(&url).json(&body).send().await;
    let response = match sent {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Simulated request failed");
            return None;
        }
    };

    let status = response.status().as_u16();
    let body = match response.json::<Value>().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(status, error = %e, "Simulated request returned a non-JSON body");
            return None;
        }
    };
    let response = EndpointResponse { status, body };
    log_response(&response);
    Some(response)
}

fn log_response(response: &EndpointResponse) {
    if response.is_success() {
        tracing::info!(status = response.status, body = %response.body, "Endpoint result");
    } else {
        tracing::warn!(status = response.status, body = %response.body, "Endpoint returned an error");
    }
}
