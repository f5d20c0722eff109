//! The executor trait the scheduler drives (§4.I). The orchestrator
//! implements this to re-run a deferred parse or metadata fetch; this crate
//! only needs to know whether the retry succeeded, failed retryably, or
//! failed permanently.

use async_trait::async_trait;
use resolver_core::error::ErrorCode;
use resolver_core::model::RetryItem;

pub struct ExecutionFailure {
    pub code: ErrorCode,
    pub detail: String,
}

impl ExecutionFailure {
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

#[async_trait]
pub trait RetryExecutor: Send + Sync {
    /// Re-attempts the work described by `item`. `Ok(())` removes it from
    /// the queue; `Err` schedules another attempt (or gives up, per
    /// `max_attempts`) using the failure's error code.
    async fn execute(&self, item: &RetryItem) -> Result<(), ExecutionFailure>;
}
