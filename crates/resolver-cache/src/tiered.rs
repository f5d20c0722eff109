//! Tiered cache (§4.B): an in-process memory tier in front of a durable
//! store supplied by the caller. A miss in memory checks the durable tier
//! and, on a hit there, promotes the entry back into memory with its
//! original TTL untouched.

use crate::durable::{DurableCacheError, DurableCacheStore};
use crate::events::CacheEvent;
use crate::memory::MemoryTier;
use resolver_core::config::CacheTtlSettings;
use resolver_core::events::EventListeners;
use resolver_core::model::{now_unix, CacheClass, CacheEntry};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Instant;

fn ttl_secs_for(class: CacheClass, settings: &CacheTtlSettings) -> Option<u64> {
    match class {
        CacheClass::Metadata => Some(settings.metadata_secs),
        CacheClass::AiParse => Some(settings.ai_parse_secs),
        CacheClass::ImageMeta => None,
    }
}

pub struct TieredCache<D: DurableCacheStore> {
    memory: StdMutex<MemoryTier>,
    durable: Arc<D>,
    ttl: CacheTtlSettings,
    listeners: EventListeners<CacheEvent>,
}

impl<D: DurableCacheStore> TieredCache<D> {
    pub fn new(durable: Arc<D>, ttl: CacheTtlSettings) -> Self {
        Self {
            memory: StdMutex::new(MemoryTier::new(ttl.memory_cache_bytes)),
            durable,
            ttl,
            listeners: EventListeners::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: EventListeners<CacheEvent>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Returns the cached value, checking memory first and falling back to
    /// the durable tier. An expired entry found in either tier is treated
    /// as a miss and removed.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DurableCacheError> {
        let now = now_unix();

        if let Some(entry) = self.memory.lock().unwrap().get(key) {
            if entry.is_expired(now) {
                self.memory.lock().unwrap().remove(key);
            } else {
                self.emit_hit(key, entry.class);
                return Ok(Some(entry.value));
            }
        }

        match self.durable.get(key).await? {
            Some(entry) if !entry.is_expired(now) => {
                self.emit_hit(key, entry.class);
                self.memory.lock().unwrap().insert(entry.clone());
                Ok(Some(entry.value))
            }
            Some(_) => {
                self.durable.remove(key).await?;
                self.emit_miss(key, CacheClass::Metadata);
                Ok(None)
            }
            None => {
                self.emit_miss(key, CacheClass::Metadata);
                Ok(None)
            }
        }
    }

    /// Writes `value` to both tiers under `class`'s declared TTL (§3, §6).
    pub async fn put(&self, key: String, value: Vec<u8>, class: CacheClass) -> Result<(), DurableCacheError> {
        let now = now_unix();
        let expires_at = ttl_secs_for(class, &self.ttl).map(|ttl| now + ttl);
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: now,
            expires_at,
            class,
            hit_count: 0,
        };
        if let Err(err) = self.durable.put(entry.clone()).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(key = %entry.key, error = %err, "durable cache write failed, keeping memory-tier write");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
        let evicted = self.memory.lock().unwrap().insert(entry);
        for key in evicted {
            self.listeners.emit(&CacheEvent::Eviction { key, timestamp: Instant::now() });
        }
        Ok(())
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), DurableCacheError> {
        self.memory.lock().unwrap().remove(key);
        self.durable.remove(key).await
    }

    /// Runs one pass of durable-tier expiry cleanup; intended to be driven
    /// by a periodic task alongside the retry scheduler's tick loop.
    pub async fn sweep(&self) -> Result<u64, DurableCacheError> {
        self.durable.sweep_expired(now_unix()).await
    }

    fn emit_hit(&self, key: &str, class: CacheClass) {
        self.listeners.emit(&CacheEvent::Hit {
            key: key.to_string(),
            class,
            timestamp: Instant::now(),
        });
    }

    fn emit_miss(&self, key: &str, class: CacheClass) {
        self.listeners.emit(&CacheEvent::Miss {
            key: key.to_string(),
            class,
            timestamp: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::memory_store::MemoryDurableCacheStore;
    use crate::durable::DurableCacheError;
    use async_trait::async_trait;

    fn cache() -> TieredCache<MemoryDurableCacheStore> {
        TieredCache::new(Arc::new(MemoryDurableCacheStore::new()), CacheTtlSettings::default())
    }

    struct AlwaysFailingDurableStore;

    #[async_trait]
    impl DurableCacheStore for AlwaysFailingDurableStore {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, DurableCacheError> {
            Ok(None)
        }
        async fn put(&self, _entry: CacheEntry) -> Result<(), DurableCacheError> {
            Err(DurableCacheError::Unavailable("store offline".into()))
        }
        async fn remove(&self, _key: &str) -> Result<(), DurableCacheError> {
            Ok(())
        }
        async fn sweep_expired(&self, _now: u64) -> Result<u64, DurableCacheError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn durable_put_failure_keeps_memory_write() {
        let cache = TieredCache::new(Arc::new(AlwaysFailingDurableStore), CacheTtlSettings::default());
        cache.put("k".into(), b"v".to_vec(), CacheClass::Metadata).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = cache();
        cache
            .put("metadata:tmdb:1:1".into(), b"payload".to_vec(), CacheClass::Metadata)
            .await
            .unwrap();
        assert_eq!(cache.get("metadata:tmdb:1:1").await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn image_meta_never_expires() {
        let cache = cache();
        cache
            .put("image-meta:tmdb:1:1".into(), b"poster".to_vec(), CacheClass::ImageMeta)
            .await
            .unwrap();
        let evicted = cache.durable.sweep_expired(u64::MAX).await.unwrap();
        assert_eq!(evicted, 0);
    }

    #[tokio::test]
    async fn miss_falls_through_both_tiers() {
        let cache = cache();
        assert_eq!(cache.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_clears_both_tiers() {
        let cache = cache();
        cache
            .put("k".into(), b"v".to_vec(), CacheClass::Metadata)
            .await
            .unwrap();
        cache.invalidate("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
