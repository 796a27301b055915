//! Secret synchronization.
//!
//! # Responsibilities
//! - Flatten the config model into named secrets
//! - Skip values whose digest matches the last upload (change tracking)
//! - Seal pending values against the repository public key and upsert them
//! - Optionally delete remote secrets that no longer exist locally
//!
//! # Design Decisions
//! - The public key is only fetched when something needs uploading, so an
//!   unchanged tracked sync makes no remote calls (unless pruning is on)
//! - Digests are recorded per successful upsert and saved even when a later
//!   call fails, so a rerun only repeats what did not go through

use std::collections::BTreeSet;
use std::future::Future;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config::schema::{ConfigModel, RepoTarget};
use crate::config::settings::SyncSettings;
use crate::observability::metrics;
use crate::resilience::{retry, RetryFailure, RetryPolicy};
use crate::sync::digest::{DigestKey, DigestStore};
use crate::sync::flatten::flatten_config;
use crate::sync::sealing::SecretSealer;
use crate::sync::store::SecretStore;
use crate::sync::types::{RemoteError, SecretEntry, SyncError, SyncReport, SyncResult};

pub struct SecretSyncer<S> {
    store: S,
    policy: RetryPolicy,
    /// `Some` when change tracking is on.
    digests: Option<DigestStore>,
    prune_missing: bool,
    function_target: Option<String>,
}

impl<S: SecretStore> SecretSyncer<S> {
    /// Untracked syncer with the default retry policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
            digests: None,
            prune_missing: false,
            function_target: None,
        }
    }

    /// Build from `[sync]` settings, loading persisted digests if configured.
    pub fn from_settings(store: S, settings: &SyncSettings) -> SyncResult<Self> {
        let digests = if settings.change_tracking {
            Some(match &settings.digest_path {
                Some(path) => DigestStore::load_from_file(path)?,
                None => {
                    tracing::warn!("Change tracking has no digest_path; digests last only for this process");
                    DigestStore::in_memory()
                }
            })
        } else {
            None
        };

        Ok(Self {
            store,
            policy: RetryPolicy::from_settings(settings),
            digests,
            prune_missing: settings.prune_missing,
            function_target: settings.function_target.clone(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_change_tracking(mut self, digests: DigestStore) -> Self {
        self.digests = Some(digests);
        self
    }

    pub fn with_prune_missing(mut self, prune: bool) -> Self {
        self.prune_missing = prune;
        self
    }

    pub fn with_function_target(mut self, target: impl Into<String>) -> Self {
        self.function_target = Some(target.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn digests(&self) -> Option<&DigestStore> {
        self.digests.as_ref()
    }

    /// Sync `config` to its `repo_synced` target.
    pub async fn sync(&mut self, config: &ConfigModel) -> SyncResult<SyncReport> {
        self.sync_with_rng(config, &mut OsRng).await
    }

    /// Like [`sync`](Self::sync) with a caller-supplied RNG for the sealed
    /// boxes' ephemeral keys.
    pub async fn sync_with_rng<R>(&mut self, config: &ConfigModel, rng: &mut R) -> SyncResult<SyncReport>
    where
        R: RngCore + CryptoRng + Send,
    {
        let target = config.repo_synced().ok_or(SyncError::NoTarget)?;
        let key = DigestKey::new(target)?;
        let repo = key.repo();
        let entries = flatten_config(config, self.function_target.as_deref())?;

        let mut report = SyncReport::default();
        let pending: Vec<&SecretEntry> = entries
            .iter()
            .filter(|entry| {
                let current = self.digests.as_ref().is_some_and(|d| d.is_current(&key, entry));
                if current {
                    report.skipped.push(entry.name.clone());
                }
                !current
            })
            .collect();

        tracing::info!(
            repo = %repo,
            secrets = entries.len(),
            pending = pending.len(),
            "Synchronizing secrets"
        );

        let outcome = self.push(target, &key, &entries, &pending, rng, &mut report).await;
        let saved = match &self.digests {
            Some(digests) => digests.save_to_file(),
            None => Ok(()),
        };
        outcome?;
        saved?;

        tracing::info!(
            repo = %repo,
            upserted = report.upserted.len(),
            skipped = report.skipped.len(),
            deleted = report.deleted.len(),
            "Secrets synchronized"
        );
        Ok(report)
    }

    async fn push<R>(
        &mut self,
        target: &RepoTarget,
        key: &DigestKey,
        entries: &[SecretEntry],
        pending: &[&SecretEntry],
        rng: &mut R,
        report: &mut SyncReport,
    ) -> SyncResult<()>
    where
        R: RngCore + CryptoRng + Send,
    {
        let repo = key.repo();
        if !pending.is_empty() {
            let public_key = self.call("public_key", || self.store.public_key(target)).await?;
            let sealer = SecretSealer::new(&public_key)?;

            for entry in pending {
                let sealed = sealer.seal(rng, &entry.name, &entry.value)?;
                self.call("upsert_secret", || {
                    self.store.upsert_secret(target, &entry.name, &sealed, sealer.key_id())
                })
                .await?;

                if let Some(digests) = self.digests.as_mut() {
                    digests.record(key, entry);
                }
                tracing::debug!(repo = %repo, secret = %entry.name, "Secret upserted");
                report.upserted.push(entry.name.clone());
            }
        }

        if self.prune_missing {
            let local: BTreeSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            let remote = self.call("list_secrets", || self.store.list_secrets(target)).await?;

            for name in remote.into_iter().filter(|name| !local.contains(name.as_str())) {
                self.call("delete_secret", || self.store.delete_secret(target, &name)).await?;
                if let Some(digests) = self.digests.as_mut() {
                    digests.forget(repo, &name);
                }
                tracing::info!(repo = %repo, secret = %name, "Pruned remote secret");
                report.deleted.push(name);
            }
        }

        Ok(())
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, op: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        match retry(&self.policy, operation, op).await {
            Ok(value) => {
                metrics::record_sync_operation(operation, "ok");
                Ok(value)
            }
            Err(RetryFailure { error, attempts }) => {
                metrics::record_sync_operation(operation, "error");
                tracing::error!(operation = %operation, attempts, error = %error, "Secret store call failed");
                Err(SyncError::Remote {
                    operation,
                    attempts,
                    source: error,
                })
            }
        }
    }
}
