//! Persistent (durable) tier
//!
//! [`PersistentStore`] is the system of record: every entry the memory tier
//! holds must also live here. [`SqliteStore`] is the bundled implementation.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::{CacheEntry, StoreAggregates};
use std::path::Path;

/// Durable, transactional key-value table keyed by cache key
///
/// Implementations must be safe to share across threads. Several handles may
/// point at the same underlying file.
pub trait PersistentStore: Send + Sync {
    /// Insert a row, or replace value and sizes of an existing one.
    ///
    /// `hit_count` and `created_at` of an existing row are preserved;
    /// `last_accessed_at` is always refreshed.
    fn upsert(&self, key: &str, value: &str, original_size: u64, compressed_size: u64)
        -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Returns true if a row existed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Delete several rows in one transaction, returning how many existed
    fn delete_many(&self, keys: &[String]) -> Result<usize>;

    fn clear(&self) -> Result<()>;

    /// All rows, most recently accessed first (ties by key ascending)
    fn scan_by_recency(&self) -> Result<Vec<CacheEntry>>;

    /// All rows, most hit first, then most recently accessed
    fn scan_by_hits(&self) -> Result<Vec<CacheEntry>>;

    /// Bump `hit_count` and refresh `last_accessed_at`; false if the row is gone
    fn increment_hit(&self, key: &str) -> Result<bool>;

    fn aggregates(&self) -> Result<StoreAggregates>;

    /// Location actually in use (may differ from the configured one after recovery)
    fn path(&self) -> &Path;

    /// Compact the underlying file
    fn vacuum(&self) -> Result<()> {
        Ok(())
    }

    /// Release file handles. Later calls fail with `StoreClosed`.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
