//! Durable retry queue (§4.I, §3 `RetryItem`). Like the cache's durable
//! tier, this is a trait the caller supplies; a `sqlx` reference
//! implementation and an in-memory one (for this crate's tests) are
//! provided.

use async_trait::async_trait;
use resolver_core::model::RetryItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetryQueueError {
    #[error("retry queue unavailable: {0}")]
    Unavailable(String),
    #[error("retry item {0} not found")]
    NotFound(String),
}

#[async_trait]
pub trait DurableRetryQueue: Send + Sync {
    async fn enqueue(&self, item: RetryItem) -> Result<(), RetryQueueError>;

    /// Items whose `next_attempt_at <= now`, ready for dispatch.
    async fn due(&self, now: u64) -> Result<Vec<RetryItem>, RetryQueueError>;

    async fn get(&self, id: &str) -> Result<Option<RetryItem>, RetryQueueError>;

    /// Persists the outcome of a dispatch attempt: incremented
    /// `attempt_count`, the new `next_attempt_at`, and the error recorded if
    /// it failed again.
    async fn record_attempt(
        &self,
        id: &str,
        attempt_count: u32,
        next_attempt_at: u64,
        last_error: Option<String>,
        last_error_code: Option<String>,
        updated_at: u64,
    ) -> Result<(), RetryQueueError>;

    async fn remove(&self, id: &str) -> Result<(), RetryQueueError>;

    async fn list_pending(&self) -> Result<Vec<RetryItem>, RetryQueueError>;
}

pub struct SqlxDurableRetryQueue {
    pool: sqlx::SqlitePool,
}

impl SqlxDurableRetryQueue {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS retry_items (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                task_type TEXT NOT NULL,
                payload BLOB NOT NULL,
                attempt_count INTEGER NOT NULL,
                max_attempts INTEGER NOT NULL,
                last_error TEXT,
                last_error_code TEXT,
                next_attempt_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RetryItemRow {
    id: String,
    task_id: String,
    task_type: String,
    payload: Vec<u8>,
    attempt_count: i64,
    max_attempts: i64,
    last_error: Option<String>,
    last_error_code: Option<String>,
    next_attempt_at: i64,
    created_at: i64,
    updated_at: i64,
}

impl RetryItemRow {
    fn into_item(self) -> RetryItem {
        use resolver_core::model::TaskType;
        RetryItem {
            id: self.id,
            task_id: self.task_id,
            task_type: if self.task_type == "metadata_fetch" {
                TaskType::MetadataFetch
            } else {
                TaskType::Parse
            },
            payload: self.payload,
            attempt_count: self.attempt_count as u32,
            max_attempts: self.max_attempts as u32,
            last_error: self.last_error,
            last_error_code: self.last_error_code,
            next_attempt_at: self.next_attempt_at as u64,
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        }
    }
}

fn task_type_str(t: resolver_core::model::TaskType) -> &'static str {
    use resolver_core::model::TaskType::*;
    match t {
        Parse => "parse",
        MetadataFetch => "metadata_fetch",
    }
}

#[async_trait]
impl DurableRetryQueue for SqlxDurableRetryQueue {
    async fn enqueue(&self, item: RetryItem) -> Result<(), RetryQueueError> {
        sqlx::query(
            "INSERT INTO retry_items
                (id, task_id, task_type, payload, attempt_count, max_attempts,
                 last_error, last_error_code, next_attempt_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.task_id)
        .bind(task_type_str(item.task_type))
        .bind(&item.payload)
        .bind(item.attempt_count as i64)
        .bind(item.max_attempts as i64)
        .bind(&item.last_error)
        .bind(&item.last_error_code)
        .bind(item.next_attempt_at as i64)
        .bind(item.created_at as i64)
        .bind(item.updated_at as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn due(&self, now: u64) -> Result<Vec<RetryItem>, RetryQueueError> {
        let rows: Vec<RetryItemRow> = sqlx::query_as(
            "SELECT id, task_id, task_type, payload, attempt_count, max_attempts,
                    last_error, last_error_code, next_attempt_at, created_at, updated_at
             FROM retry_items WHERE next_attempt_at <= ? ORDER BY next_attempt_at ASC",
        )
        .bind(now as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(rows.into_iter().map(RetryItemRow::into_item).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<RetryItem>, RetryQueueError> {
        let row: Option<RetryItemRow> = sqlx::query_as(
            "SELECT id, task_id, task_type, payload, attempt_count, max_attempts,
                    last_error, last_error_code, next_attempt_at, created_at, updated_at
             FROM retry_items WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(row.map(RetryItemRow::into_item))
    }

    async fn record_attempt(
        &self,
        id: &str,
        attempt_count: u32,
        next_attempt_at: u64,
        last_error: Option<String>,
        last_error_code: Option<String>,
        updated_at: u64,
    ) -> Result<(), RetryQueueError> {
        sqlx::query(
            "UPDATE retry_items SET attempt_count = ?, next_attempt_at = ?,
                last_error = ?, last_error_code = ?, updated_at = ? WHERE id = ?",
        )
        .bind(attempt_count as i64)
        .bind(next_attempt_at as i64)
        .bind(&last_error)
        .bind(&last_error_code)
        .bind(updated_at as i64)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), RetryQueueError> {
        sqlx::query("DELETE FROM retry_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<RetryItem>, RetryQueueError> {
        let rows: Vec<RetryItemRow> = sqlx::query_as(
            "SELECT id, task_id, task_type, payload, attempt_count, max_attempts,
                    last_error, last_error_code, next_attempt_at, created_at, updated_at
             FROM retry_items ORDER BY next_attempt_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetryQueueError::Unavailable(e.to_string()))?;
        Ok(rows.into_iter().map(RetryItemRow::into_item).collect())
    }
}

/// In-memory stand-in for [`DurableRetryQueue`], suitable for single-process
/// deployments with no persistence requirement.
pub mod memory_queue {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryRetryQueue {
        items: Mutex<HashMap<String, RetryItem>>,
    }

    impl MemoryRetryQueue {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DurableRetryQueue for MemoryRetryQueue {
        async fn enqueue(&self, item: RetryItem) -> Result<(), RetryQueueError> {
            self.items.lock().unwrap().insert(item.id.clone(), item);
            Ok(())
        }

        async fn due(&self, now: u64) -> Result<Vec<RetryItem>, RetryQueueError> {
            let mut items: Vec<RetryItem> = self
                .items
                .lock()
                .unwrap()
                .values()
                .filter(|i| i.is_ready(now))
                .cloned()
                .collect();
            items.sort_by_key(|i| i.next_attempt_at);
            Ok(items)
        }

        async fn get(&self, id: &str) -> Result<Option<RetryItem>, RetryQueueError> {
            Ok(self.items.lock().unwrap().get(id).cloned())
        }

        async fn record_attempt(
            &self,
            id: &str,
            attempt_count: u32,
            next_attempt_at: u64,
            last_error: Option<String>,
            last_error_code: Option<String>,
            updated_at: u64,
        ) -> Result<(), RetryQueueError> {
            let mut items = self.items.lock().unwrap();
            let item = items.get_mut(id).ok_or_else(|| RetryQueueError::NotFound(id.to_string()))?;
            item.attempt_count = attempt_count;
            item.next_attempt_at = next_attempt_at;
            item.last_error = last_error;
            item.last_error_code = last_error_code;
            item.updated_at = updated_at;
            Ok(())
        }

        async fn remove(&self, id: &str) -> Result<(), RetryQueueError> {
            self.items.lock().unwrap().remove(id);
            Ok(())
        }

        async fn list_pending(&self) -> Result<Vec<RetryItem>, RetryQueueError> {
            let mut items: Vec<RetryItem> = self.items.lock().unwrap().values().cloned().collect();
            items.sort_by_key(|i| i.next_attempt_at);
            Ok(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory_queue::MemoryRetryQueue;
    use super::*;
    use resolver_core::model::TaskType;

    fn item(id: &str, next_attempt_at: u64) -> RetryItem {
        RetryItem {
            id: id.to_string(),
            task_id: "task-1".into(),
            task_type: TaskType::MetadataFetch,
            payload: vec![],
            attempt_count: 0,
            max_attempts: 4,
            last_error: None,
            last_error_code: None,
            next_attempt_at,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn due_filters_on_next_attempt_at() {
        let queue = MemoryRetryQueue::new();
        queue.enqueue(item("a", 100)).await.unwrap();
        queue.enqueue(item("b", 500)).await.unwrap();
        let due = queue.due(200).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "a");
    }

    #[tokio::test]
    async fn record_attempt_updates_item() {
        let queue = MemoryRetryQueue::new();
        queue.enqueue(item("a", 0)).await.unwrap();
        queue
            .record_attempt("a", 1, 1000, Some("timeout".into()), Some("METADATA_TIMEOUT".into()), 50)
            .await
            .unwrap();
        let reloaded = queue.get("a").await.unwrap().unwrap();
        assert_eq!(reloaded.attempt_count, 1);
        assert_eq!(reloaded.next_attempt_at, 1000);
    }

    #[tokio::test]
    async fn remove_drops_item() {
        let queue = MemoryRetryQueue::new();
        queue.enqueue(item("a", 0)).await.unwrap();
        queue.remove("a").await.unwrap();
        assert!(queue.get("a").await.unwrap().is_none());
    }
}
