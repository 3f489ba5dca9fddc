//! Data models for tokcache

pub mod entry;
pub mod stats;

pub use entry::{CacheEntry, CachedValue};
pub use stats::{CacheStats, RuntimeSnapshot, RuntimeStats, StoreAggregates};
