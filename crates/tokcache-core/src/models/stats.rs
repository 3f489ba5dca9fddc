//! Cache statistics
//!
//! Entry counts, hit totals and size sums are aggregated from the persistent
//! table. Misses and the hit rate come from process-local counters, so the
//! reported `hit_rate` starts again at 0 after every restart even though the
//! persisted `total_hits` survive. This mix is part of the contract.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregates computed by the persistent store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreAggregates {
    pub entry_count: u64,
    pub hit_sum: u64,
    pub compressed_sum: u64,
    pub original_sum: u64,
}

/// Process-lifetime request counters (never persisted)
#[derive(Debug, Default)]
pub struct RuntimeStats {
    hits: AtomicU64,
    misses: AtomicU64,
    semantic_hits: AtomicU64,
}

/// Point-in-time copy of [`RuntimeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub semantic_hits: u64,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_semantic_hit(&self) {
        self.semantic_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.semantic_hits.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            semantic_hits: self.semantic_hits.load(Ordering::Relaxed),
        }
    }
}

impl RuntimeSnapshot {
    /// hits / (hits + misses), 0.0 before the first request
    pub fn hit_rate(&self) -> f64 {
        let requests = self.hits + self.misses;
        if requests == 0 {
            return 0.0;
        }
        self.hits as f64 / requests as f64
    }
}

/// Stats snapshot returned by [`CacheEngine::stats`](crate::CacheEngine::stats)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    /// Sum of persisted per-entry hit counts
    pub total_hits: u64,
    /// Misses seen by this process since start or last clear
    pub total_misses: u64,
    /// Hit rate of this process since start or last clear
    pub hit_rate: f64,
    pub total_compressed_size: u64,
    pub total_original_size: u64,
    /// compressed / original, 0.0 when nothing is stored
    pub compression_ratio: f64,
    pub semantic_hits: u64,
    /// Vectors held by the semantic index (0 when semantic mode is off)
    pub vector_count: u64,
}

impl CacheStats {
    pub fn compose(store: StoreAggregates, runtime: RuntimeSnapshot, vector_count: u64) -> Self {
        let compression_ratio = if store.original_sum == 0 {
            0.0
        } else {
            store.compressed_sum as f64 / store.original_sum as f64
        };

        Self {
            total_entries: store.entry_count,
            total_hits: store.hit_sum,
            total_misses: runtime.misses,
            hit_rate: runtime.hit_rate(),
            total_compressed_size: store.compressed_sum,
            total_original_size: store.original_sum,
            compression_ratio,
            semantic_hits: runtime.semantic_hits,
            vector_count,
        }
    }

    /// Bytes saved across all entries
    pub fn saved_bytes(&self) -> u64 {
        self.total_original_size
            .saturating_sub(self.total_compressed_size)
    }
}
