//! `RetryItem.payload` shapes (§3, §4.I). `task_type` selects which one a
//! [`crate::executor::OrchestratorExecutor`] deserializes.

use resolver_core::model::ParseCandidate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTaskPayload {
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFetchTaskPayload {
    pub filename: String,
    pub candidate: ParseCandidate,
}
