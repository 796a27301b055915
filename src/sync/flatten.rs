//! Config model to flat secret entries.

use std::path::Path;

use crate::config::schema::{ConfigField, ConfigModel};
use crate::credentials::certificate::encode_certificate_file;
use crate::sync::types::{SecretEntry, SyncResult};

/// Secret naming the endpoint function a deployed trigger should invoke.
pub const FUNCTION_TARGET_SECRET: &str = "GCF_FUNCTION_TARGET";

/// One entry per populated field, named by its environment variable.
///
/// Nested objects become JSON strings, the same encoding the env source
/// reads back. A certificate given as a file path is shipped as the base64 of
/// the file, since the path means nothing on a CI runner.
pub fn flatten_config(config: &ConfigModel, function_target: Option<&str>) -> SyncResult<Vec<SecretEntry>> {
    let mut entries = Vec::with_capacity(ConfigField::ALL.len() + 1);

    for field in ConfigField::ALL {
        let value = match field {
            ConfigField::GcfServiceAccount => config.gcf_service_account().to_string(),
            ConfigField::RepoSynced => match config.repo_synced() {
                Some(target) => serde_json::json!({
                    "owner": target.owner,
                    "repo": target.repo,
                    "pat": target.pat,
                })
                .to_string(),
                None => continue,
            },
            ConfigField::FugleCert => certificate_value(config.fugle_cert())?,
            other => match config.text(other) {
                Some(text) => text.to_string(),
                None => continue,
            },
        };
        entries.push(SecretEntry::new(field.env_name(), value));
    }

    if let Some(target) = function_target.filter(|t| !t.is_empty()) {
        entries.push(SecretEntry::new(FUNCTION_TARGET_SECRET, target));
    }

    Ok(entries)
}

fn certificate_value(cert: &str) -> SyncResult<String> {
    let path = Path::new(cert);
    if path.is_file() {
        tracing::debug!(path = %path.display(), "Encoding certificate file for upload");
        return Ok(encode_certificate_file(path)?);
    }
    Ok(cert.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::fixtures::sample_model;
    use std::io::Write;

    fn find<'a>(entries: &'a [SecretEntry], name: &str) -> Option<&'a SecretEntry> {
        entries.iter().find(|e| e.name == name)
    }

    #[test]
    fn test_every_field_flattened() {
        let entries = flatten_config(&sample_model(), None).unwrap();
        assert_eq!(entries.len(), ConfigField::ALL.len());
        assert_eq!(find(&entries, "FUGLE_ACCOUNT").unwrap().value, "0000000");
        assert_eq!(find(&entries, "FUGLE_CERT").unwrap().value, "aGVsbG8gY2VydA==");
    }

    #[test]
    fn test_nested_objects_are_json_strings() {
        let entries = flatten_config(&sample_model(), None).unwrap();
        let gcf: serde_json::Value =
            serde_json::from_str(&find(&entries, "GCF_SERVICE_ACCOUNT").unwrap().value).unwrap();
        assert_eq!(gcf["project_id"], "demo");

        let repo: serde_json::Value = serde_json::from_str(&find(&entries, "REPO_SYNCED").unwrap().value).unwrap();
        assert_eq!(repo["owner"], "octo");
        assert_eq!(repo["pat"], "ghp_example");
    }

    #[test]
    fn test_absent_repo_and_function_target() {
        let mut model = sample_model();
        model.repo_synced = None;
        let entries = flatten_config(&model, Some("create_orders")).unwrap();
        assert!(find(&entries, "REPO_SYNCED").is_none());
        assert_eq!(find(&entries, FUNCTION_TARGET_SECRET).unwrap().value, "create_orders");
    }

    #[test]
    fn test_certificate_path_uploaded_as_base64() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello cert").unwrap();
        let mut model = sample_model();
        model.fugle_cert = file.path().display().to_string();

        let entries = flatten_config(&model, None).unwrap();
        assert_eq!(find(&entries, "FUGLE_CERT").unwrap().value, "aGVsbG8gY2VydA==");
    }
}
