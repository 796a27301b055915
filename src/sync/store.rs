//! Remote secret store client.
//!
//! # Responsibilities
//! - Fetch the repository public key
//! - Create or update an encrypted secret
//! - List and delete secrets (pruning)
//!
//! # Design Decisions
//! - One attempt per call; retrying is the syncer's job
//! - Every non-2xx status becomes a `RemoteError` carrying the status, so
//!   the caller can tell transient from permanent failures

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::schema::RepoTarget;
use crate::sync::types::{RemoteError, RepoPublicKey, SyncError, SyncResult};

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Seam between the syncer and the remote store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn public_key(&self, target: &RepoTarget) -> Result<RepoPublicKey, RemoteError>;

    async fn upsert_secret(
        &self,
        target: &RepoTarget,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), RemoteError>;

    async fn list_secrets(&self, target: &RepoTarget) -> Result<Vec<String>, RemoteError>;

    async fn delete_secret(&self, target: &RepoTarget, name: &str) -> Result<(), RemoteError>;
}

/// GitHub Actions secrets over the REST API.
#[derive(Debug, Clone)]
pub struct GithubSecretStore {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct SecretList {
    secrets: Vec<SecretName>,
}

#[derive(Deserialize)]
struct SecretName {
    name: String,
}

impl GithubSecretStore {
    pub fn new(api_base: &str, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("f5-runtime/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn secrets_url(&self, target: &RepoTarget) -> String {
        format!("{}/repos/{}/{}/actions/secrets", self.api_base, target.owner, target.repo)
    }

    fn request(&self, method: reqwest::Method, url: &str, target: &RepoTarget) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&target.pat)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

/// Send and turn anything but 2xx into a `RemoteError`.
async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
    let response = builder.send().await.map_err(network_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::http(status.as_u16(), error_message(&body, status)))
}

fn network_error(err: reqwest::Error) -> RemoteError {
    match err.status() {
        Some(status) => RemoteError::http(status.as_u16(), err.to_string()),
        None => RemoteError::network(err.to_string()),
    }
}

/// The API's `message` field when present, else the reason phrase.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_string())
}

#[async_trait]
impl SecretStore for GithubSecretStore {
    async fn public_key(&self, target: &RepoTarget) -> Result<RepoPublicKey, RemoteError> {
        let url = format!("{}/public-key", self.secrets_url(target));
        let response = send(self.request(reqwest::Method::GET, &url, target)).await?;
        response
            .json::<RepoPublicKey>()
            .await
            .map_err(|e| RemoteError::network(format!("malformed public key response: {}", e)))
    }

    async fn upsert_secret(
        &self,
        target: &RepoTarget,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.secrets_url(target), name);
        let body = json!({ "encrypted_value": encrypted_value, "key_id": key_id });
        send(self.request(reqwest::Method::PUT, &url, target).json(&body)).await?;
        Ok(())
    }

    async fn list_secrets(&self, target: &RepoTarget) -> Result<Vec<String>, RemoteError> {
        let url = self.secrets_url(target);
        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let request = self
                .request(reqwest::Method::GET, &url, target)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let list: SecretList = send(request)
                .await?
                .json()
                .await
                .map_err(|e| RemoteError::network(format!("malformed secret list: {}", e)))?;
            let count = list.secrets.len();
            names.extend(list.secrets.into_iter().map(|s| s.name));
            if count < PAGE_SIZE {
                return Ok(names);
            }
            page += 1;
        }
    }

    async fn delete_secret(&self, target: &RepoTarget, name: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.secrets_url(target), name);
        send(self.request(reqwest::Method::DELETE, &url, target)).await?;
        Ok(())
    }
}
