//! Configuration schema definitions.
//!
//! [`ConfigModel`] holds every secret a strategy project needs. It is built
//! once by the resolver and never mutated afterwards; consumers get read-only
//! accessors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every field of the secrets model, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigField {
    FinlabApiToken,
    FugleAccount,
    FuglePassword,
    FugleCert,
    FugleCertPassword,
    FugleApiEntry,
    FugleApiKey,
    FugleApiSecret,
    FugleMarketApiKey,
    GcfServiceAccount,
    RepoSynced,
}

impl ConfigField {
    pub const ALL: [ConfigField; 11] = [
        ConfigField::FinlabApiToken,
        ConfigField::FugleAccount,
        ConfigField::FuglePassword,
        ConfigField::FugleCert,
        ConfigField::FugleCertPassword,
        ConfigField::FugleApiEntry,
        ConfigField::FugleApiKey,
        ConfigField::FugleApiSecret,
        ConfigField::FugleMarketApiKey,
        ConfigField::GcfServiceAccount,
        ConfigField::RepoSynced,
    ];

    /// Key used in the JSON secrets file.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigField::FinlabApiToken => "finlab_api_token",
            ConfigField::FugleAccount => "fugle_account",
            ConfigField::FuglePassword => "fugle_password",
            ConfigField::FugleCert => "fugle_cert",
            ConfigField::FugleCertPassword => "fugle_cert_password",
            ConfigField::FugleApiEntry => "fugle_api_entry",
            ConfigField::FugleApiKey => "fugle_api_key",
            ConfigField::FugleApiSecret => "fugle_api_secret",
            ConfigField::FugleMarketApiKey => "fugle_market_api_key",
            ConfigField::GcfServiceAccount => "gcf_service_account",
            ConfigField::RepoSynced => "repo_synced",
        }
    }

    /// Environment variable name. This is a stable contract with the CI
    /// workflow template and must not change.
    pub fn env_name(&self) -> String {
        self.key().to_ascii_uppercase()
    }

    /// Nested object fields: objects in JSON files, JSON strings in env vars.
    pub fn is_json(&self) -> bool {
        matches!(self, ConfigField::GcfServiceAccount | ConfigField::RepoSynced)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ConfigField::RepoSynced)
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Remote repository whose CI secret store mirrors the local secrets.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    /// Personal access token with permission to write repository secrets.
    pub pat: String,
}

impl RepoTarget {
    /// `owner/repo`, used as the key for local sync state.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Debug for RepoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoTarget")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("pat", &"<REDACTED>")
            .finish()
    }
}

/// Fully resolved project secrets.
///
/// Every required field is non-empty; construction only happens through
/// [`crate::config::resolver::ConfigResolver`]. **Values are redacted in
/// `Debug` output.**
#[derive(Clone, PartialEq)]
pub struct ConfigModel {
    pub(crate) finlab_api_token: String,
    pub(crate) fugle_account: String,
    pub(crate) fugle_password: String,
    /// Either a path to a certificate file or base64 of its bytes.
    pub(crate) fugle_cert: String,
    pub(crate) fugle_cert_password: String,
    pub(crate) fugle_api_entry: String,
    pub(crate) fugle_api_key: String,
    pub(crate) fugle_api_secret: String,
    pub(crate) fugle_market_api_key: String,
    pub(crate) gcf_service_account: Value,
    pub(crate) repo_synced: Option<RepoTarget>,
}

impl ConfigModel {
    pub fn finlab_api_token(&self) -> &str {
        &self.finlab_api_token
    }

    pub fn fugle_account(&self) -> &str {
        &self.fugle_account
    }

    pub fn fugle_password(&self) -> &str {
        &self.fugle_password
    }

    pub fn fugle_cert(&self) -> &str {
        &self.fugle_cert
    }

    pub fn fugle_cert_password(&self) -> &str {
        &self.fugle_cert_password
    }

    pub fn fugle_api_entry(&self) -> &str {
        &self.fugle_api_entry
    }

    pub fn fugle_api_key(&self) -> &str {
        &self.fugle_api_key
    }

    pub fn fugle_api_secret(&self) -> &str {
        &self.fugle_api_secret
    }

    pub fn fugle_market_api_key(&self) -> &str {
        &self.fugle_market_api_key
    }

    /// Cloud credentials, passed through exactly as configured.
    pub fn gcf_service_account(&self) -> &Value {
        &self.gcf_service_account
    }

    pub fn repo_synced(&self) -> Option<&RepoTarget> {
        self.repo_synced.as_ref()
    }

    /// Value of a plain string field. `None` for the nested object fields.
    pub fn text(&self, field: ConfigField) -> Option<&str> {
        let value = match field {
            ConfigField::FinlabApiToken => &self.finlab_api_token,
            ConfigField::FugleAccount => &self.fugle_account,
            ConfigField::FuglePassword => &self.fugle_password,
            ConfigField::FugleCert => &self.fugle_cert,
            ConfigField::FugleCertPassword => &self.fugle_cert_password,
            ConfigField::FugleApiEntry => &self.fugle_api_entry,
            ConfigField::FugleApiKey => &self.fugle_api_key,
            ConfigField::FugleApiSecret => &self.fugle_api_secret,
            ConfigField::FugleMarketApiKey => &self.fugle_market_api_key,
            ConfigField::GcfServiceAccount | ConfigField::RepoSynced => return None,
        };
        Some(value)
    }
}

impl std::fmt::Debug for ConfigModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret values.
        f.debug_struct("ConfigModel")
            .field("finlab_api_token", &"<REDACTED>")
            .field("fugle_account", &"<REDACTED>")
            .field("fugle_password", &"<REDACTED>")
            .field("fugle_cert", &"<REDACTED>")
            .field("fugle_cert_password", &"<REDACTED>")
            .field("fugle_api_entry", &self.fugle_api_entry)
            .field("fugle_api_key", &"<REDACTED>")
            .field("fugle_api_secret", &"<REDACTED>")
            .field("fugle_market_api_key", &"<REDACTED>")
            .field("gcf_service_account", &"<REDACTED>")
            .field("repo_synced", &self.repo_synced)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    /// A fully populated model for unit tests in other modules.
    pub(crate) fn sample_model() -> ConfigModel {
        ConfigModel {
            finlab_api_token: "finlab-token".to_string(),
            fugle_account: "0000000".to_string(),
            fugle_password: "fugle-password".to_string(),
            fugle_cert: "aGVsbG8gY2VydA==".to_string(),
            fugle_cert_password: "cert-password".to_string(),
            fugle_api_entry: "https://api.fugle.tw/trade".to_string(),
            fugle_api_key: "api-key".to_string(),
            fugle_api_secret: "api-secret".to_string(),
            fugle_market_api_key: "market-key".to_string(),
            gcf_service_account: json!({"type": "service_account", "project_id": "demo"}),
            repo_synced: Some(RepoTarget {
                owner: "octo".to_string(),
                repo: "strategies".to_string(),
                pat: "ghp_example".to_string(),
            }),
        }
    }
}
