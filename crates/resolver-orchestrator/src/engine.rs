//! The central algorithm (§4.H) and the four external operations (§6) the
//! engine exposes to a collaborator: `resolve`, `confirm_manual`,
//! `cancel_retry`/`trigger_retry_now`, `list_pending_retries`.

use resolver_cache::DurableCacheError;
use resolver_core::model::{CacheClass, MediaIdentity, ProviderOrigin, RetryItem};
use resolver_learning::LearningStoreError;
use resolver_retry::{DurableRetryQueue, RetryQueueError, RetryScheduler};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::events::OrchestratorEvent;
use crate::executor::OrchestratorExecutor;
use crate::outcome::Outcome;
use crate::resolve::{attempt_metadata, parse_filename};
use crate::retry_item::{metadata_retry_item, parse_retry_item};
use crate::shared::Shared;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cache unavailable: {0}")]
    Cache(#[from] DurableCacheError),
    #[error("retry queue unavailable: {0}")]
    RetryQueue(#[from] RetryQueueError),
    #[error("learning store unavailable or entry rejected: {0}")]
    Learning(#[from] LearningStoreError),
}

/// The single construction point for a fully wired resolution engine (§9:
/// "avoid module-level singletons"). Build one with
/// [`crate::builder::EngineBuilder`] and share it behind an `Arc`.
pub struct Engine {
    shared: Arc<Shared>,
    retry: Arc<RetryScheduler<dyn DurableRetryQueue, OrchestratorExecutor>>,
}

impl Engine {
    pub(crate) fn new(shared: Arc<Shared>, retry: Arc<RetryScheduler<dyn DurableRetryQueue, OrchestratorExecutor>>) -> Self {
        Self { shared, retry }
    }

    /// Starts the background retry scheduler tick loop. Idempotent.
    pub fn start(&self) {
        self.retry.start();
    }

    /// Stops the scheduler, waiting up to `grace` for in-flight dispatches.
    pub async fn stop(&self, grace: Duration) {
        self.retry.stop(grace).await;
    }

    /// §4.H, the central algorithm. `deadline` bounds steps 2-5 (parsing and
    /// the provider chain); if it elapses with adapter calls still in
    /// flight, the orchestrator treats that the same way it treats a
    /// retryable provider failure (§5: "the orchestrator may still write a
    /// RetryItem to preserve progress").
    pub async fn resolve(&self, filename: &str, deadline: Duration) -> Result<Outcome, EngineError> {
        let fingerprint = resolver_learning::fingerprint(filename);

        if let Some(rule) = self.shared.learning.lookup(&fingerprint).await? {
            self.shared.learning.record_hit(&fingerprint).await?;
            let mut identity = rule.target_identity;
            identity.provider_origin = ProviderOrigin::Learned;
            self.emit_succeeded(filename, identity.provider_origin);
            return Ok(Outcome::Resolved(identity));
        }

        match tokio::time::timeout(deadline, self.resolve_within_deadline(filename)).await {
            Ok(result) => result,
            Err(_) => {
                let item = parse_retry_item(&self.shared, filename);
                let id = item.id.clone();
                self.retry.enqueue(item).await?;
                self.emit_pending(filename, &id);
                Ok(Outcome::PendingRetry(id))
            }
        }
    }

    async fn resolve_within_deadline(&self, filename: &str) -> Result<Outcome, EngineError> {
        let candidate = match parse_filename(&self.shared, filename).await {
            Ok(candidate) => candidate,
            Err(err) => {
                return Ok(if err.code.is_retryable() {
                    let item = parse_retry_item(&self.shared, filename);
                    let id = item.id.clone();
                    self.retry.enqueue(item).await?;
                    self.emit_pending(filename, &id);
                    Outcome::PendingRetry(id)
                } else {
                    let reasons = vec![err.detail];
                    self.emit_manual(filename, reasons.clone());
                    Outcome::ManualRequired(reasons)
                });
            }
        };

        match attempt_metadata(&self.shared, &candidate).await {
            Ok(identity) => {
                self.emit_succeeded(filename, identity.provider_origin);
                Ok(Outcome::Resolved(identity))
            }
            Err(failures) => {
                if failures.iter().any(|f| f.is_retryable()) {
                    let item = metadata_retry_item(&self.shared, filename, &candidate);
                    let id = item.id.clone();
                    self.retry.enqueue(item).await?;
                    self.emit_pending(filename, &id);
                    Ok(Outcome::PendingRetry(id))
                } else {
                    let reasons: Vec<String> = failures.into_iter().map(|f| f.detail).collect();
                    self.emit_manual(filename, reasons.clone());
                    Ok(Outcome::ManualRequired(reasons))
                }
            }
        }
    }

    /// §4.H step 7 / §6: persists a correction and caches the confirmed
    /// identity under the key a future parse of a similarly-titled filename
    /// would compute.
    pub async fn confirm_manual(&self, fingerprint: &str, identity: MediaIdentity, created_by: impl Into<String>) -> Result<(), EngineError> {
        self.shared
            .learning
            .upsert(fingerprint.to_string(), identity.clone(), created_by.into())
            .await?;

        let key = resolver_cache::key::candidate_key(&identity.title_primary, identity.year, identity.season, identity.episode);
        if let Ok(serialized) = serde_json::to_vec(&identity) {
            self.shared.cache.put(key, serialized, CacheClass::Metadata).await?;
        }

        self.shared.listeners.emit(&OrchestratorEvent::ManualCorrectionRecorded {
            fingerprint: fingerprint.to_string(),
            timestamp: Instant::now(),
        });
        Ok(())
    }

    pub async fn cancel_retry(&self, retry_item_id: &str) -> Result<(), EngineError> {
        self.retry.cancel(retry_item_id).await?;
        Ok(())
    }

    pub async fn trigger_retry_now(&self, retry_item_id: &str) -> Result<(), EngineError> {
        self.retry.trigger_immediate(retry_item_id).await?;
        Ok(())
    }

    pub async fn list_pending_retries(&self) -> Result<Vec<RetryItem>, EngineError> {
        Ok(self.retry.list_pending().await?)
    }

    fn emit_succeeded(&self, filename: &str, provider_origin: ProviderOrigin) {
        self.shared.listeners.emit(&OrchestratorEvent::ResolutionSucceeded {
            filename: filename.to_string(),
            provider_origin,
            timestamp: Instant::now(),
        });
    }

    fn emit_pending(&self, filename: &str, retry_item_id: &str) {
        self.shared.listeners.emit(&OrchestratorEvent::ResolutionPendingRetry {
            filename: filename.to_string(),
            retry_item_id: retry_item_id.to_string(),
            timestamp: Instant::now(),
        });
    }

    fn emit_manual(&self, filename: &str, reasons: Vec<String>) {
        self.shared.listeners.emit(&OrchestratorEvent::ResolutionManualRequired {
            filename: filename.to_string(),
            reasons,
            timestamp: Instant::now(),
        });
    }
}
