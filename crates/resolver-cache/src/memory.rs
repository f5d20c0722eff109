//! In-process memory tier (§4.B): an LRU store bounded by an approximate
//! byte budget rather than entry count, since `CacheEntry::value` sizes vary
//! wildly between a `metadata` row and an `ai-parse` row.

use lru::LruCache;
use resolver_core::model::CacheEntry;
use std::num::NonZeroUsize;

fn approx_size(entry: &CacheEntry) -> usize {
    entry.key.len() + entry.value.len() + 64
}

pub struct MemoryTier {
    store: LruCache<String, CacheEntry>,
    byte_budget: u64,
    bytes_used: u64,
}

impl MemoryTier {
    pub fn new(byte_budget: u64) -> Self {
        Self {
            // lru::LruCache still needs a nonzero entry cap as a backstop
            // against unbounded map growth when entries are near-empty.
            store: LruCache::new(NonZeroUsize::new(1 << 20).unwrap()),
            byte_budget,
            bytes_used: 0,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        self.store.get(key).cloned()
    }

    /// Inserts `entry`, evicting least-recently-used entries until the byte
    /// budget is satisfied. Returns the keys evicted as a result.
    pub fn insert(&mut self, entry: CacheEntry) -> Vec<String> {
        let mut evicted = Vec::new();
        if let Some(old) = self.store.push(entry.key.clone(), entry.clone()).map(|(_, v)| v) {
            self.bytes_used = self.bytes_used.saturating_sub(approx_size(&old) as u64);
        }
        self.bytes_used += approx_size(&entry) as u64;

        while self.bytes_used > self.byte_budget {
            match self.store.pop_lru() {
                Some((key, value)) => {
                    self.bytes_used = self.bytes_used.saturating_sub(approx_size(&value) as u64);
                    evicted.push(key);
                }
                None => break,
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.store.pop(key);
        if let Some(entry) = &removed {
            self.bytes_used = self.bytes_used.saturating_sub(approx_size(entry) as u64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_core::model::CacheClass;

    fn entry(key: &str, bytes: usize) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            value: vec![0u8; bytes],
            inserted_at: 0,
            expires_at: None,
            class: CacheClass::Metadata,
            hit_count: 0,
        }
    }

    #[test]
    fn evicts_lru_when_over_budget() {
        let mut tier = MemoryTier::new(200);
        tier.insert(entry("a", 50));
        tier.insert(entry("b", 50));
        assert!(tier.get("a").is_some());
        let evicted = tier.insert(entry("c", 150));
        assert!(!evicted.is_empty());
        assert!(tier.len() < 3);
    }

    #[test]
    fn get_promotes_recency() {
        let mut tier = MemoryTier::new(10_000);
        tier.insert(entry("a", 10));
        tier.insert(entry("b", 10));
        assert!(tier.get("a").is_some());
        tier.insert(entry("c", 9_980));
        assert!(tier.get("a").is_some() || tier.get("b").is_some());
    }

    #[test]
    fn remove_updates_bytes_used() {
        let mut tier = MemoryTier::new(200);
        tier.insert(entry("a", 50));
        assert!(tier.remove("a").is_some());
        assert_eq!(tier.bytes_used, 0);
    }
}
