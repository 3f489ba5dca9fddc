//! Two-tier cache engine
//!
//! Reads go memory tier first, then the persistent store (backfilling the
//! memory tier on a store hit). Writes go to the store and through to the
//! memory tier. With semantic mode on, keys written via
//! [`CacheEngine::set_with_semantic`] are embedded so that later lookups for
//! similar (not identical) keys can still resolve.

use crate::config::{CacheConfig, SemanticConfig};
use crate::error::{CoreError, Result};
use crate::memory::MemoryTier;
use crate::models::{CacheEntry, CacheStats, CachedValue, RuntimeStats};
use crate::semantic::{BruteForceIndex, EmbeddingGenerator, SearchHit, VectorIndex};
use crate::store::{PersistentStore, SqliteStore};
use std::path::Path;
use tracing::{debug, info};

/// Lifecycle of an engine. Construction failure never yields an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Ready,
    Closed,
}

struct SemanticLayer {
    generator: EmbeddingGenerator,
    index: Box<dyn VectorIndex>,
    threshold: f32,
    top_k: usize,
}

impl SemanticLayer {
    fn new(config: &SemanticConfig) -> Self {
        Self {
            generator: EmbeddingGenerator::new(config.dimensions),
            index: Box::new(BruteForceIndex::new(config.dimensions)),
            threshold: config.similarity_threshold,
            top_k: config.top_k as usize,
        }
    }

    fn candidates(&self, query: &str) -> Result<Vec<SearchHit>> {
        let vector = self.generator.generate(query);
        self.index.search(&vector, self.top_k, self.threshold)
    }
}

/// Cache engine over a memory tier and a persistent store
///
/// All operations are blocking and local. The engine is `Send + Sync` and can
/// be shared through `Arc`; several engines may also open the same store file.
pub struct CacheEngine {
    store: Box<dyn PersistentStore>,
    memory: MemoryTier,
    semantic: Option<SemanticLayer>,
    stats: RuntimeStats,
}

impl CacheEngine {
    /// Open the SQLite store named by `config` and build the engine
    ///
    /// Fails only with [`CoreError::InvalidConfig`] or, once all three store
    /// opening attempts are exhausted, [`CoreError::StoreInit`].
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let path = config.resolved_store_path();
        let store = SqliteStore::open(&path, config.busy_timeout())?;
        Self::with_store(config, Box::new(store))
    }

    /// Build the engine around an already opened store
    pub fn with_store(config: CacheConfig, store: Box<dyn PersistentStore>) -> Result<Self> {
        config.validate()?;

        let memory = MemoryTier::new(config.max_memory_items, config.memory_ttl());
        let semantic = config.semantic_enabled().map(SemanticLayer::new);

        info!(
            path = %store.path().display(),
            max_memory_items = config.max_memory_items,
            semantic = semantic.is_some(),
            "Cache engine ready"
        );

        Ok(Self {
            store,
            memory,
            semantic,
            stats: RuntimeStats::new(),
        })
    }

    /// Replace the semantic vector index (e.g. with an approximate one)
    pub fn with_vector_index(mut self, index: Box<dyn VectorIndex>) -> Result<Self> {
        let layer = self.semantic.as_mut().ok_or_else(|| {
            CoreError::invalid_config("vector index supplied but semantic mode is disabled")
        })?;

        if index.dimensions() != layer.generator.dimensions() {
            return Err(CoreError::DimensionMismatch {
                expected: layer.generator.dimensions(),
                actual: index.dimensions(),
            });
        }

        layer.index = index;
        Ok(self)
    }

    /// Path of the store actually in use
    pub fn database_path(&self) -> &Path {
        self.store.path()
    }

    pub fn state(&self) -> EngineState {
        if self.store.is_closed() {
            EngineState::Closed
        } else {
            EngineState::Ready
        }
    }

    pub fn is_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    // ===================
    // Exact-key access
    // ===================

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_with_metadata(key)?.map(|v| v.content))
    }

    /// Like [`get`](Self::get), also returning the stored compressed size
    pub fn get_with_metadata(&self, key: &str) -> Result<Option<CachedValue>> {
        match self.lookup(key)? {
            Some(value) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                self.stats.record_miss();
                debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Tier walk without touching runtime counters; persisted hit counts still move
    fn lookup(&self, key: &str) -> Result<Option<CachedValue>> {
        if let Some(value) = self.memory.get(key) {
            if self.store.increment_hit(key)? {
                debug!(key = %key, "Memory tier hit");
                return Ok(Some(value));
            }
            // Row removed through another handle
            self.memory.delete(key);
        }

        let Some(entry) = self.store.get(key)? else {
            return Ok(None);
        };

        self.store.increment_hit(key)?;
        self.memory.set(key, &entry.value, entry.compressed_size);
        debug!(key = %key, "Store hit, memory tier backfilled");

        Ok(Some(CachedValue {
            content: entry.value,
            compressed_size: entry.compressed_size,
        }))
    }

    /// Store a payload; an existing entry keeps its hit count and creation time
    pub fn set(&self, key: &str, value: &str, original_size: u64, compressed_size: u64) -> Result<()> {
        self.store.upsert(key, value, original_size, compressed_size)?;
        self.memory.set(key, value, compressed_size);
        Ok(())
    }

    /// Remove from both tiers (and the vector index); true if a stored row existed
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.memory.delete(key);
        if let Some(layer) = &self.semantic {
            layer.index.delete(key);
        }
        let existed = self.store.delete(key)?;
        debug!(key = %key, existed, "Entry deleted");
        Ok(existed)
    }

    /// Empty both tiers and the vector index, and reset runtime counters
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        self.memory.clear();
        if let Some(layer) = &self.semantic {
            layer.index.clear();
        }
        self.stats.reset();
        info!("Cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let aggregates = self.store.aggregates()?;
        let vector_count = self
            .semantic
            .as_ref()
            .map_or(0, |layer| layer.index.len() as u64);
        Ok(CacheStats::compose(aggregates, self.stats.snapshot(), vector_count))
    }

    /// Keep the most recently accessed entries whose sizes fit in `max_total_bytes`
    ///
    /// Entries are walked newest first (ties by key ascending) accumulating
    /// `compressed_size`; the walk stops at the first entry that would exceed
    /// the budget, and that entry plus everything after it is removed.
    /// Returns the number of removed entries.
    pub fn evict_lru(&self, max_total_bytes: u64) -> Result<usize> {
        let entries = self.store.scan_by_recency()?;

        let mut running: u64 = 0;
        let keep = entries
            .iter()
            .take_while(|entry| {
                running = running.saturating_add(entry.compressed_size);
                running <= max_total_bytes
            })
            .count();

        let doomed: Vec<String> = entries.into_iter().skip(keep).map(|e| e.key).collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let removed = self.store.delete_many(&doomed)?;
        for key in &doomed {
            self.memory.delete(key);
            if let Some(layer) = &self.semantic {
                layer.index.delete(key);
            }
        }

        info!(
            removed,
            kept = keep,
            max_total_bytes,
            "LRU eviction complete"
        );
        Ok(removed)
    }

    /// Every entry, most hit first then most recently accessed (diagnostics)
    pub fn all_entries(&self) -> Result<Vec<CacheEntry>> {
        self.store.scan_by_hits()
    }

    /// Full metadata for one entry; does not count as a hit
    pub fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.store.get(key)
    }

    // ===================
    // Semantic access
    // ===================

    /// Exact lookup first, then the closest semantically similar stored key
    ///
    /// Candidates are tried best first; the first one that still resolves to a
    /// stored value wins and counts as a semantic hit. Vectors whose entries
    /// have disappeared are dropped along the way. Without semantic mode this
    /// is a plain [`get`](Self::get).
    pub fn get_with_semantic(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.get(key)? {
            return Ok(Some(value));
        }

        let Some(layer) = &self.semantic else {
            return Ok(None);
        };

        for hit in layer.candidates(key)? {
            match self.lookup(&hit.id)? {
                Some(value) => {
                    self.stats.record_semantic_hit();
                    debug!(
                        key = %key,
                        matched = %hit.id,
                        similarity = hit.similarity,
                        "Semantic hit"
                    );
                    return Ok(Some(value.content));
                }
                None => {
                    layer.index.delete(&hit.id);
                }
            }
        }

        Ok(None)
    }

    /// [`set`](Self::set), then index the key's embedding for semantic lookup
    pub fn set_with_semantic(
        &self,
        key: &str,
        value: &str,
        original_size: u64,
        compressed_size: u64,
    ) -> Result<()> {
        self.set(key, value, original_size, compressed_size)?;
        if let Some(layer) = &self.semantic {
            layer.index.add(key, layer.generator.generate(key))?;
        }
        Ok(())
    }

    /// Same as [`delete`](Self::delete), which already drops the key's vector
    pub fn delete_with_semantic(&self, key: &str) -> Result<bool> {
        self.delete(key)
    }

    /// Same as [`clear`](Self::clear), which already empties the vector index
    pub fn clear_with_semantic(&self) -> Result<()> {
        self.clear()
    }

    /// Re-embed every stored key, replacing the vector index contents
    ///
    /// Vectors live only in this process, so a fresh engine over an existing
    /// store starts with an empty index. Afterwards every stored key is
    /// semantically reachable, including keys written with plain
    /// [`set`](Self::set). Returns the number of indexed keys.
    pub fn rebuild_semantic_index(&self) -> Result<usize> {
        let Some(layer) = &self.semantic else {
            return Ok(0);
        };

        layer.index.clear();
        let entries = self.store.scan_by_recency()?;
        for entry in &entries {
            layer.index.add(&entry.key, layer.generator.generate(&entry.key))?;
        }

        info!(vectors = entries.len(), "Semantic index rebuilt");
        Ok(entries.len())
    }

    /// Ranked candidates a semantic lookup for `query` would try
    pub fn semantic_candidates(&self, query: &str) -> Result<Vec<SearchHit>> {
        match &self.semantic {
            Some(layer) => layer.candidates(query),
            None => Ok(Vec::new()),
        }
    }

    // ===================
    // Maintenance
    // ===================

    /// Compact the store file (useful after large evictions)
    pub fn vacuum(&self) -> Result<()> {
        self.store.vacuum()
    }

    /// Release the store and drop in-process state; idempotent
    pub fn close(&self) -> Result<()> {
        self.memory.clear();
        if let Some(layer) = &self.semantic {
            layer.index.clear();
        }
        self.store.close()
    }
}
