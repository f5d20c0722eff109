//! Binds a [`RetryItem`] back onto the orchestration step its `task_type`
//! names (§4.I): `parse` re-enters step 2 onward, `metadata_fetch` re-enters
//! step 3 onward. Re-running a step's own failure is reported to the
//! scheduler as `Err` so it backs off the *same* item; a parse that now
//! succeeds but whose downstream metadata fetch fails retryably spawns a
//! fresh `metadata_fetch` item instead, since that is new work the parse
//! task is not responsible for retrying.

use async_trait::async_trait;
use resolver_core::model::{RetryItem, TaskType};
use resolver_retry::{DurableRetryQueue, ExecutionFailure, RetryExecutor, RetryScheduler};
use std::sync::{Arc, OnceLock, Weak};

use crate::events::OrchestratorEvent;
use crate::payload::{MetadataFetchTaskPayload, ParseTaskPayload};
use crate::resolve::{attempt_metadata, parse_filename};
use crate::retry_item::metadata_retry_item;
use crate::shared::Shared;

pub struct OrchestratorExecutor {
    shared: Arc<Shared>,
    scheduler: OnceLock<Weak<RetryScheduler<dyn DurableRetryQueue, OrchestratorExecutor>>>,
}

impl OrchestratorExecutor {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            scheduler: OnceLock::new(),
        }
    }

    /// Must be called exactly once, right after the [`RetryScheduler`] that
    /// owns this executor is constructed, so a parse-task retry can enqueue
    /// a follow-on metadata-fetch item.
    pub fn bind_scheduler(&self, scheduler: Weak<RetryScheduler<dyn DurableRetryQueue, OrchestratorExecutor>>) {
        let _ = self.scheduler.set(scheduler);
    }

    async fn execute_parse(&self, payload: ParseTaskPayload) -> Result<(), ExecutionFailure> {
        let candidate = parse_filename(&self.shared, &payload.filename)
            .await
            .map_err(|err| ExecutionFailure { code: err.code, detail: err.detail })?;

        match attempt_metadata(&self.shared, &candidate).await {
            Ok(identity) => {
                self.shared.listeners.emit(&OrchestratorEvent::ResolutionSucceeded {
                    filename: payload.filename,
                    provider_origin: identity.provider_origin,
                    timestamp: std::time::Instant::now(),
                });
                Ok(())
            }
            Err(failures) => {
                if failures.iter().any(|f| f.is_retryable()) {
                    let item = metadata_retry_item(&self.shared, &payload.filename, &candidate);
                    let id = item.id.clone();
                    if let Some(scheduler) = self.scheduler.get().and_then(Weak::upgrade) {
                        let _ = scheduler.enqueue(item).await;
                    }
                    self.shared.listeners.emit(&OrchestratorEvent::ResolutionPendingRetry {
                        filename: payload.filename,
                        retry_item_id: id,
                        timestamp: std::time::Instant::now(),
                    });
                } else {
                    self.shared.listeners.emit(&OrchestratorEvent::ResolutionManualRequired {
                        filename: payload.filename,
                        reasons: failures.into_iter().map(|f| f.detail).collect(),
                        timestamp: std::time::Instant::now(),
                    });
                }
                // The parse step itself succeeded; downstream disposition
                // (retry or manual) has already been recorded above.
                Ok(())
            }
        }
    }

    async fn execute_metadata_fetch(&self, payload: MetadataFetchTaskPayload) -> Result<(), ExecutionFailure> {
        match attempt_metadata(&self.shared, &payload.candidate).await {
            Ok(identity) => {
                self.shared.listeners.emit(&OrchestratorEvent::ResolutionSucceeded {
                    filename: payload.filename,
                    provider_origin: identity.provider_origin,
                    timestamp: std::time::Instant::now(),
                });
                Ok(())
            }
            Err(failures) => {
                if let Some(retryable) = failures.iter().find(|f| f.is_retryable()) {
                    Err(ExecutionFailure {
                        code: retryable.code,
                        detail: retryable.detail.clone(),
                    })
                } else {
                    self.shared.listeners.emit(&OrchestratorEvent::ResolutionManualRequired {
                        filename: payload.filename,
                        reasons: failures.into_iter().map(|f| f.detail).collect(),
                        timestamp: std::time::Instant::now(),
                    });
                    Ok(())
                }
            }
        }
    }
}

#[async_trait]
impl RetryExecutor for OrchestratorExecutor {
    async fn execute(&self, item: &RetryItem) -> Result<(), ExecutionFailure> {
        match item.task_type {
            TaskType::Parse => {
                let payload: ParseTaskPayload = serde_json::from_slice(&item.payload).map_err(|e| ExecutionFailure {
                    code: resolver_core::error::ErrorCode::ParseUnparseable,
                    detail: format!("corrupt parse retry payload: {e}"),
                })?;
                self.execute_parse(payload).await
            }
            TaskType::MetadataFetch => {
                let payload: MetadataFetchTaskPayload =
                    serde_json::from_slice(&item.payload).map_err(|e| ExecutionFailure {
                        code: resolver_core::error::ErrorCode::MetadataInvalidInput,
                        detail: format!("corrupt metadata retry payload: {e}"),
                    })?;
                self.execute_metadata_fetch(payload).await
            }
        }
    }
}
