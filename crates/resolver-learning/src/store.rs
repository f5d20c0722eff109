//! Learning store (§4.K, §3 `LearningRule`). A correction recorded once is
//! consulted before any provider on every later resolution that fingerprints
//! to the same value (§4.H step 1).

use async_trait::async_trait;
use resolver_core::model::{now_unix, LearningRule, MediaIdentity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearningStoreError {
    #[error("learning store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<LearningRule>, LearningStoreError>;

    /// Records a manual correction. If a rule already exists for this
    /// fingerprint its `hit_count` carries forward rather than resetting,
    /// since the rule is being refined, not created anew.
    async fn upsert(&self, fingerprint: String, target_identity: MediaIdentity, created_by: String) -> Result<(), LearningStoreError>;

    /// Bumps `hit_count` when a lookup is served from a rule (§4.K).
    async fn record_hit(&self, fingerprint: &str) -> Result<(), LearningStoreError>;
}

pub struct SqlxLearningStore {
    pool: sqlx::SqlitePool,
}

impl SqlxLearningStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS learning_rules (
                fingerprint TEXT PRIMARY KEY,
                target_identity TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct LearningRuleRow {
    fingerprint: String,
    target_identity: String,
    created_by: String,
    created_at: i64,
    hit_count: i64,
}

impl LearningRuleRow {
    fn into_rule(self) -> Result<LearningRule, LearningStoreError> {
        let target_identity: MediaIdentity =
            serde_json::from_str(&self.target_identity).map_err(|e| LearningStoreError::Unavailable(e.to_string()))?;
        Ok(LearningRule {
            fingerprint: self.fingerprint,
            target_identity,
            created_by: self.created_by,
            created_at: self.created_at as u64,
            hit_count: self.hit_count as u64,
        })
    }
}

#[async_trait]
impl LearningStore for SqlxLearningStore {
    async fn lookup(&self, fingerprint: &str) -> Result<Option<LearningRule>, LearningStoreError> {
        let row: Option<LearningRuleRow> = sqlx::query_as(
            "SELECT fingerprint, target_identity, created_by, created_at, hit_count FROM learning_rules WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LearningStoreError::Unavailable(e.to_string()))?;
        row.map(LearningRuleRow::into_rule).transpose()
    }

    async fn upsert(&self, fingerprint: String, target_identity: MediaIdentity, created_by: String) -> Result<(), LearningStoreError> {
        let serialized =
            serde_json::to_string(&target_identity).map_err(|e| LearningStoreError::Unavailable(e.to_string()))?;
        sqlx::query(
            "INSERT INTO learning_rules (fingerprint, target_identity, created_by, created_at, hit_count)
             VALUES (?, ?, ?, ?, 0)
             ON CONFLICT(fingerprint) DO UPDATE SET
                target_identity = excluded.target_identity,
                created_by = excluded.created_by",
        )
        .bind(&fingerprint)
        .bind(serialized)
        .bind(created_by)
        .bind(now_unix() as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| LearningStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn record_hit(&self, fingerprint: &str) -> Result<(), LearningStoreError> {
        sqlx::query("UPDATE learning_rules SET hit_count = hit_count + 1 WHERE fingerprint = ?")
            .bind(fingerprint)
            .execute(&self.pool)
            .await
            .map_err(|e| LearningStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

/// In-memory stand-in for tests, exposed publicly so other crates can build
/// a fully in-process engine without a database.
pub mod memory_store {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryLearningStore {
        rules: Mutex<HashMap<String, LearningRule>>,
    }

    impl MemoryLearningStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl LearningStore for MemoryLearningStore {
        async fn lookup(&self, fingerprint: &str) -> Result<Option<LearningRule>, LearningStoreError> {
            Ok(self.rules.lock().unwrap().get(fingerprint).cloned())
        }

        async fn upsert(&self, fingerprint: String, target_identity: MediaIdentity, created_by: String) -> Result<(), LearningStoreError> {
            let mut rules = self.rules.lock().unwrap();
            let hit_count = rules.get(&fingerprint).map(|r| r.hit_count).unwrap_or(0);
            rules.insert(
                fingerprint.clone(),
                LearningRule {
                    fingerprint,
                    target_identity,
                    created_by,
                    created_at: now_unix(),
                    hit_count,
                },
            );
            Ok(())
        }

        async fn record_hit(&self, fingerprint: &str) -> Result<(), LearningStoreError> {
            if let Some(rule) = self.rules.lock().unwrap().get_mut(fingerprint) {
                rule.hit_count += 1;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory_store::MemoryLearningStore;
    use super::*;
    use resolver_core::model::{MediaKind, ProviderOrigin};

    fn identity() -> MediaIdentity {
        MediaIdentity {
            kind: MediaKind::Movie,
            provider_id: "1".into(),
            provider_origin: ProviderOrigin::Manual,
            title_primary: "Corrected Title".into(),
            title_original: "Corrected Title".into(),
            title_alternatives: Vec::new(),
            year: Some(2020),
            overview: None,
            genres: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
            poster_ref: None,
            fetched_at: now_unix(),
            season: None,
            episode: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_lookup_roundtrips() {
        let store = MemoryLearningStore::new();
        store.upsert("fp".into(), identity(), "user-1".into()).await.unwrap();
        let rule = store.lookup("fp").await.unwrap().unwrap();
        assert_eq!(rule.target_identity.title_primary, "Corrected Title");
        assert_eq!(rule.hit_count, 0);
    }

    #[tokio::test]
    async fn record_hit_increments_without_losing_rule() {
        let store = MemoryLearningStore::new();
        store.upsert("fp".into(), identity(), "user-1".into()).await.unwrap();
        store.record_hit("fp").await.unwrap();
        store.record_hit("fp").await.unwrap();
        assert_eq!(store.lookup("fp").await.unwrap().unwrap().hit_count, 2);
    }

    #[tokio::test]
    async fn upsert_preserves_hit_count_across_refinement() {
        let store = MemoryLearningStore::new();
        store.upsert("fp".into(), identity(), "user-1".into()).await.unwrap();
        store.record_hit("fp").await.unwrap();
        let mut refined = identity();
        refined.title_primary = "Even Better Title".into();
        store.upsert("fp".into(), refined, "user-2".into()).await.unwrap();
        let rule = store.lookup("fp").await.unwrap().unwrap();
        assert_eq!(rule.hit_count, 1);
        assert_eq!(rule.target_identity.title_primary, "Even Better Title");
    }
}
