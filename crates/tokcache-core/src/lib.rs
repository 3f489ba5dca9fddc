//! tokcache-core - Core library for tokcache
//!
//! A local two-tier cache for already-encoded payloads (memory tier in front
//! of a durable SQLite store), with optional semantic lookup so that a key
//! similar to a stored one can still resolve.
//!
//! ```no_run
//! use tokcache_core::{CacheConfig, CacheEngine, SemanticConfig};
//!
//! # fn main() -> tokcache_core::Result<()> {
//! let config = CacheConfig::with_store_path("/tmp/tokcache/cache.db").semantic(SemanticConfig {
//!     similarity_threshold: 0.6,
//!     ..SemanticConfig::default()
//! });
//! let cache = CacheEngine::new(config)?;
//!
//! cache.set_with_semantic("get user information from database", "resp1", 10, 10)?;
//! assert_eq!(
//!     cache.get_with_semantic("retrieve user info from db")?.as_deref(),
//!     Some("resp1")
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod models;
pub mod semantic;
pub mod store;

pub use config::{CacheConfig, SemanticConfig};
pub use engine::{CacheEngine, EngineState};
pub use error::{CoreError, OpenAttempt, OpenReport, Result};
pub use memory::MemoryTier;
pub use models::{CacheEntry, CacheStats, CachedValue};
pub use semantic::{cosine_similarity, BruteForceIndex, EmbeddingGenerator, SearchHit, VectorIndex};
pub use store::{PersistentStore, SqliteStore};
