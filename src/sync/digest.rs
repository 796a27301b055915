//! Local record of what was last uploaded.
//!
//! Stores an HMAC-SHA256 digest per secret and repository so an unchanged
//! value can be skipped without contacting the store. Only digests are kept,
//! never the values. The MAC key is the repository token, which is never
//! written to the digest file, so a leaked file cannot be checked against
//! guessed values.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::schema::RepoTarget;
use crate::sync::types::{SecretEntry, SyncError, SyncResult};

type HmacSha256 = Hmac<Sha256>;

/// Digest key for one repository.
#[derive(Clone)]
pub struct DigestKey {
    repo: String,
    mac: HmacSha256,
}

impl DigestKey {
    pub fn new(target: &RepoTarget) -> SyncResult<Self> {
        let mac = HmacSha256::new_from_slice(target.pat.as_bytes())
            .map_err(|e| SyncError::Client(format!("invalid digest key: {}", e)))?;
        Ok(Self {
            repo: target.slug(),
            mac,
        })
    }

    /// `owner/repo` the digests are recorded under.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Hex HMAC over the name and value, NUL separated.
    pub fn digest(&self, entry: &SecretEntry) -> String {
        let mut mac = self.mac.clone();
        mac.update(entry.name.as_bytes());
        mac.update(&[0u8]);
        mac.update(entry.value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for DigestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestKey").field("repo", &self.repo).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DigestStore {
    /// repository slug -> secret name -> hex digest
    repos: BTreeMap<String, BTreeMap<String, String>>,
    persistence_path: Option<PathBuf>,
}

impl DigestStore {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; saves go back to the same path.
    pub fn load_from_file(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let mut store = Self {
            repos: BTreeMap::new(),
            persistence_path: Some(path.clone()),
        };
        if path.exists() {
            let file = File::open(&path).map_err(|e| store_error(&path, e))?;
            store.repos = serde_json::from_reader(BufReader::new(file)).map_err(|e| store_error(&path, e))?;
            tracing::debug!(path = %path.display(), repos = store.repos.len(), "Loaded secret digests");
        }
        Ok(store)
    }

    /// Write to the persistence path, if any.
    pub fn save_to_file(&self) -> SyncResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| store_error(path, e))?;
        }
        let file = File::create(path).map_err(|e| store_error(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.repos).map_err(|e| store_error(path, e))?;
        tracing::debug!(path = %path.display(), "Saved secret digests");
        Ok(())
    }

    pub fn is_current(&self, key: &DigestKey, entry: &SecretEntry) -> bool {
        self.repos
            .get(key.repo())
            .and_then(|secrets| secrets.get(&entry.name))
            .is_some_and(|recorded| *recorded == key.digest(entry))
    }

    pub fn record(&mut self, key: &DigestKey, entry: &SecretEntry) {
        self.repos
            .entry(key.repo().to_string())
            .or_default()
            .insert(entry.name.clone(), key.digest(entry));
    }

    pub fn forget(&mut self, repo: &str, name: &str) {
        if let Some(secrets) = self.repos.get_mut(repo) {
            secrets.remove(name);
        }
    }

    pub fn len(&self, repo: &str) -> usize {
        self.repos.get(repo).map_or(0, BTreeMap::len)
    }

    pub fn path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> SyncError {
    SyncError::DigestStore {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
