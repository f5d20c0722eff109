//! Builds [`RetryItem`] rows for the two task types the orchestrator
//! defers: a low-confidence parse still waiting on the AI parser, and a
//! parsed candidate whose provider chain failed retryably (§4.H step 6).

use resolver_core::model::{now_unix, ParseCandidate, RetryItem, TaskType};

use crate::payload::{MetadataFetchTaskPayload, ParseTaskPayload};
use crate::shared::Shared;

pub fn parse_retry_item(shared: &Shared, filename: &str) -> RetryItem {
    let payload = ParseTaskPayload { filename: filename.to_string() };
    new_item(shared, TaskType::Parse, &payload)
}

pub fn metadata_retry_item(shared: &Shared, filename: &str, candidate: &ParseCandidate) -> RetryItem {
    let payload = MetadataFetchTaskPayload {
        filename: filename.to_string(),
        candidate: candidate.clone(),
    };
    new_item(shared, TaskType::MetadataFetch, &payload)
}

fn new_item(shared: &Shared, task_type: TaskType, payload: &impl serde::Serialize) -> RetryItem {
    let now = now_unix();
    let id = uuid::Uuid::new_v4().to_string();
    RetryItem {
        id: id.clone(),
        task_id: id,
        task_type,
        payload: serde_json::to_vec(payload).unwrap_or_default(),
        attempt_count: 0,
        max_attempts: shared.config.scheduler.max_retry_attempts,
        last_error: None,
        last_error_code: None,
        next_attempt_at: now + shared.backoff.delay(0).as_secs(),
        created_at: now,
        updated_at: now,
    }
}
