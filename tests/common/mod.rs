//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crypto_box::SecretKey;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use f5_runtime::config::{ConfigModel, ConfigResolver, ConfigSource, EnvVars};

/// A request as seen by a mock backend.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Start a programmable mock backend on an ephemeral port.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            204 => "204 No Content",
                            401 => "401 Unauthorized",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: BTreeMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// In-memory stand-in for the repository secrets API.
#[allow(dead_code)]
pub struct MockSecretsApi {
    pub secret_key: SecretKey,
    pub secrets: Mutex<BTreeMap<String, String>>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

#[allow(dead_code)]
impl MockSecretsApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            secret_key: SecretKey::generate(&mut StdRng::seed_from_u64(5)),
            secrets: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer one request the way the real API would.
    pub fn respond(&self, request: RecordedRequest) -> (u16, String) {
        self.requests.lock().unwrap().push(request.clone());
        let prefix = "/repos/octo/strategies/actions/secrets";
        let Some(rest) = request.path.strip_prefix(prefix) else {
            return (404, json!({"message": "Not Found"}).to_string());
        };

        match (request.method.as_str(), rest) {
            ("GET", "/public-key") => (
                200,
                json!({
                    "key_id": "012345678912345678",
                    "key": STANDARD.encode(self.secret_key.public_key().as_bytes()),
                })
                .to_string(),
            ),
            ("GET", query) if query.is_empty() || query.starts_with('?') => {
                let names: Vec<Value> = self
                    .secrets
                    .lock()
                    .unwrap()
                    .keys()
                    .map(|name| json!({"name": name}))
                    .collect();
                (200, json!({"total_count": names.len(), "secrets": names}).to_string())
            }
            ("PUT", name) => {
                let body: Value = serde_json::from_str(&request.body).unwrap_or(Value::Null);
                let Some(sealed) = body["encrypted_value"].as_str() else {
                    return (422, json!({"message": "Invalid request"}).to_string());
                };
                self.secrets
                    .lock()
                    .unwrap()
                    .insert(name.trim_start_matches('/').to_string(), sealed.to_string());
                (201, String::new())
            }
            ("DELETE", name) => {
                self.secrets.lock().unwrap().remove(name.trim_start_matches('/'));
                (204, String::new())
            }
            _ => (404, json!({"message": "Not Found"}).to_string()),
        }
    }

    pub fn opened(&self, name: &str) -> String {
        let sealed = self.secrets.lock().unwrap()[name].clone();
        let bytes = self.secret_key.unseal(&STANDARD.decode(sealed).unwrap()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.method == method).count()
    }
}

/// Every field as `(VARIABLE, value)`, the CI flavour of the config.
#[allow(dead_code)]
pub fn config_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("FINLAB_API_TOKEN", "finlab-token"),
        ("FUGLE_ACCOUNT", "0000000"),
        ("FUGLE_PASSWORD", "fugle-password"),
        ("FUGLE_CERT", "aGVsbG8gY2VydA=="),
        ("FUGLE_CERT_PASSWORD", "cert-password"),
        ("FUGLE_API_ENTRY", "https://api.fugle.tw/trade"),
        ("FUGLE_API_KEY", "api-key"),
        ("FUGLE_API_SECRET", "api-secret"),
        ("FUGLE_MARKET_API_KEY", "market-key"),
        ("GCF_SERVICE_ACCOUNT", r#"{"type":"service_account","project_id":"demo"}"#),
        ("REPO_SYNCED", r#"{"owner":"octo","repo":"strategies","pat":"ghp_example"}"#),
    ]
}

#[allow(dead_code)]
pub fn config_env() -> EnvVars {
    config_pairs().into_iter().collect()
}

/// The same fields as a JSON secrets file in `dir`.
#[allow(dead_code)]
pub fn write_config_file(dir: &Path) -> PathBuf {
    let path = dir.join("index.json");
    let contents = json!({
        "finlab_api_token": "finlab-token",
        "fugle_account": "0000000",
        "fugle_password": "fugle-password",
        "fugle_cert": "aGVsbG8gY2VydA==",
        "fugle_cert_password": "cert-password",
        "fugle_api_entry": "https://api.fugle.tw/trade",
        "fugle_api_key": "api-key",
        "fugle_api_secret": "api-secret",
        "fugle_market_api_key": "market-key",
        "gcf_service_account": {"type": "service_account", "project_id": "demo"},
        "repo_synced": {"owner": "octo", "repo": "strategies", "pat": "ghp_example"},
    });
    std::fs::write(&path, serde_json::to_string_pretty(&contents).unwrap()).unwrap();
    path
}

#[allow(dead_code)]
pub fn sample_config() -> ConfigModel {
    ConfigResolver::default()
        .resolve(&[ConfigSource::Env(config_env())])
        .unwrap()
}
