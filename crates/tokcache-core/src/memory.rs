//! In-process memory tier
//!
//! Bounded by item count and per-item time-to-live, evicting the least
//! recently read or written item when full. Moka evicts on its own
//! when either limit is hit; the persistent store never learns about it, and
//! a miss here says nothing about the store.

use crate::models::CachedValue;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct MemoryItem {
    content: Arc<str>,
    compressed_size: u64,
}

/// Recency-ordered, expiring front cache of recently used entries
#[derive(Clone)]
pub struct MemoryTier {
    cache: Cache<String, Arc<MemoryItem>>,
}

impl MemoryTier {
    pub fn new(max_items: u32, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(u64::from(max_items))
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache }
    }

    pub fn get(&self, key: &str) -> Option<CachedValue> {
        self.cache.get(key).map(|item| CachedValue {
            content: item.content.to_string(),
            compressed_size: item.compressed_size,
        })
    }

    pub fn set(&self, key: &str, content: &str, compressed_size: u64) {
        let item = MemoryItem {
            content: Arc::from(content),
            compressed_size,
        };
        self.cache.insert(key.to_string(), Arc::new(item));
    }

    pub fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Approximate number of live items
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
