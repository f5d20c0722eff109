//! The durable cache tier (§6: "consumed from collaborators"). The engine
//! depends only on [`DurableCacheStore`]; a SQL-backed reference
//! implementation is provided for deployments that want one without writing
//! their own, and an in-memory implementation backs the crate's own tests.

use async_trait::async_trait;
use resolver_core::model::CacheEntry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurableCacheError {
    #[error("durable cache store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DurableCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, DurableCacheError>;
    async fn put(&self, entry: CacheEntry) -> Result<(), DurableCacheError>;
    async fn remove(&self, key: &str) -> Result<(), DurableCacheError>;
    /// Deletes every row with `expires_at <= now`; the scheduler's sweep
    /// calls this on a timer so expired entries don't linger forever.
    async fn sweep_expired(&self, now: u64) -> Result<u64, DurableCacheError>;
}

/// `sqlx`-backed reference implementation against the `cache_entries` table
/// (§3): `key primary key, value blob, inserted_at, expires_at nullable,
/// class, hit_count`.
pub struct SqlxDurableCacheStore {
    pool: sqlx::SqlitePool,
}

impl SqlxDurableCacheStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                inserted_at INTEGER NOT NULL,
                expires_at INTEGER,
                class TEXT NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DurableCacheStore for SqlxDurableCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, DurableCacheError> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            "SELECT key, value, inserted_at, expires_at, class, hit_count FROM cache_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DurableCacheError::Unavailable(e.to_string()))?;
        Ok(row.map(CacheEntryRow::into_entry))
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), DurableCacheError> {
        let class = class_str(entry.class);
        sqlx::query(
            "INSERT INTO cache_entries (key, value, inserted_at, expires_at, class, hit_count)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                inserted_at = excluded.inserted_at,
                expires_at = excluded.expires_at,
                class = excluded.class,
                hit_count = excluded.hit_count",
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .bind(entry.inserted_at as i64)
        .bind(entry.expires_at.map(|v| v as i64))
        .bind(class)
        .bind(entry.hit_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| DurableCacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DurableCacheError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| DurableCacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn sweep_expired(&self, now: u64) -> Result<u64, DurableCacheError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| DurableCacheError::Unavailable(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct CacheEntryRow {
    key: String,
    value: Vec<u8>,
    inserted_at: i64,
    expires_at: Option<i64>,
    class: String,
    hit_count: i64,
}

impl CacheEntryRow {
    fn into_entry(self) -> CacheEntry {
        CacheEntry {
            key: self.key,
            value: self.value,
            inserted_at: self.inserted_at as u64,
            expires_at: self.expires_at.map(|v| v as u64),
            class: class_from_str(&self.class),
            hit_count: self.hit_count as u64,
        }
    }
}

fn class_str(class: resolver_core::model::CacheClass) -> &'static str {
    use resolver_core::model::CacheClass::*;
    match class {
        Metadata => "metadata",
        AiParse => "ai-parse",
        ImageMeta => "image-meta",
    }
}

fn class_from_str(s: &str) -> resolver_core::model::CacheClass {
    use resolver_core::model::CacheClass::*;
    match s {
        "ai-parse" => AiParse,
        "image-meta" => ImageMeta,
        _ => Metadata,
    }
}

/// In-memory stand-in for [`DurableCacheStore`], used by this crate's own
/// tests and suitable for single-process deployments with no persistence
/// requirement.
pub mod memory_store {
    use super::*;
    use std::sync::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct MemoryDurableCacheStore {
        rows: Mutex<HashMap<String, CacheEntry>>,
    }

    impl MemoryDurableCacheStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DurableCacheStore for MemoryDurableCacheStore {
        async fn get(&self, key: &str) -> Result<Option<CacheEntry>, DurableCacheError> {
            Ok(self.rows.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, entry: CacheEntry) -> Result<(), DurableCacheError> {
            self.rows.lock().unwrap().insert(entry.key.clone(), entry);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), DurableCacheError> {
            self.rows.lock().unwrap().remove(key);
            Ok(())
        }

        async fn sweep_expired(&self, now: u64) -> Result<u64, DurableCacheError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|_, entry| !entry.is_expired(now));
            Ok((before - rows.len()) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory_store::MemoryDurableCacheStore;
    use super::*;
    use resolver_core::model::CacheClass;

    fn entry(key: &str, expires_at: Option<u64>) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            value: vec![1, 2, 3],
            inserted_at: 0,
            expires_at,
            class: CacheClass::Metadata,
            hit_count: 0,
        }
    }

    #[tokio::test]
    async fn memory_store_roundtrips() {
        let store = MemoryDurableCacheStore::new();
        store.put(entry("k", None)).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_removes_expired_rows_only() {
        let store = MemoryDurableCacheStore::new();
        store.put(entry("expired", Some(10))).await.unwrap();
        store.put(entry("alive", Some(1000))).await.unwrap();
        let removed = store.sweep_expired(500).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("expired").await.unwrap().is_none());
        assert!(store.get("alive").await.unwrap().is_some());
    }
}
