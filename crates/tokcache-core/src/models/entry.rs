//! Cached payload record

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One row of the persistent table
///
/// `key` is unique. `created_at` is fixed at first insertion, `hit_count`
/// only grows until the table is cleared, and `last_accessed_at` moves on
/// every read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,

    /// Opaque payload, stored and returned verbatim
    pub value: String,

    pub compressed_size: u64,
    pub original_size: u64,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Bytes saved by compression (0 if the payload grew)
    pub fn saved_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }
}

/// Payload plus its stored compressed size, as returned by metadata lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedValue {
    pub content: String,
    pub compressed_size: u64,
}

/// Current time in the millisecond resolution stored in the table
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_roundtrip_and_saved_bytes() {
        let now = now_millis();
        assert_eq!(from_millis(now).timestamp_millis(), now);

        let entry = CacheEntry {
            key: "k".into(),
            value: "v".into(),
            compressed_size: 40,
            original_size: 100,
            hit_count: 0,
            created_at: from_millis(now),
            last_accessed_at: from_millis(now),
        };
        assert_eq!(entry.saved_bytes(), 60);

        let grown = CacheEntry {
            compressed_size: 120,
            ..entry
        };
        assert_eq!(grown.saved_bytes(), 0);
    }
}
