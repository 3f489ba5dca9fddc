//! Cache configuration
//!
//! Loaded from a TOML file where every field is optional:
//!
//! ```toml
//! store_path = "/var/cache/tokcache/cache.db"
//! max_memory_items = 1000
//! memory_ttl_secs = 3600
//!
//! [semantic]
//! enabled = true
//! similarity_threshold = 0.85
//! top_k = 5
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the store inside the default cache directory
pub const DEFAULT_DB_FILE: &str = "cache.db";

/// Configuration for [`CacheEngine`](crate::CacheEngine)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Store file location (default: `<cache dir>/tokcache/cache.db`)
    pub store_path: Option<PathBuf>,

    /// Maximum entries held by the in-process memory tier
    pub max_memory_items: u32,

    /// Lifetime of a memory tier entry, in seconds
    pub memory_ttl_secs: u64,

    /// How long a handle waits on a locked store before giving up, in milliseconds
    pub busy_timeout_ms: u64,

    /// Semantic lookup settings; `None` disables semantic mode
    pub semantic: Option<SemanticConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            max_memory_items: 1000,
            memory_ttl_secs: 3600,
            busy_timeout_ms: 5000,
            semantic: None,
        }
    }
}

/// Semantic (approximate) lookup settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,

    /// Minimum cosine similarity for a candidate to be considered (0.0-1.0)
    pub similarity_threshold: f32,

    /// Maximum candidates tried per semantic lookup
    pub top_k: u32,

    /// Embedding vector length
    pub dimensions: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.85,
            top_k: 5,
            dimensions: 128,
        }
    }
}

impl CacheConfig {
    /// Config with the store at an explicit path
    pub fn with_store_path(path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Enable semantic lookup with the given settings
    pub fn semantic(mut self, semantic: SemanticConfig) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|source| CoreError::ConfigParse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_memory_items == 0 {
            return Err(CoreError::invalid_config(
                "max_memory_items must be greater than 0",
            ));
        }

        if let Some(semantic) = &self.semantic {
            semantic.validate()?;
        }

        Ok(())
    }

    /// Semantic settings if semantic mode is switched on
    pub fn semantic_enabled(&self) -> Option<&SemanticConfig> {
        self.semantic.as_ref().filter(|s| s.enabled)
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Store path to try first
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(default_store_path)
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(CoreError::invalid_config(format!(
                "similarity_threshold must be within 0.0..=1.0, got {}",
                self.similarity_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(CoreError::invalid_config("top_k must be greater than 0"));
        }
        if self.dimensions < 3 {
            return Err(CoreError::invalid_config(format!(
                "dimensions must be at least 3, got {}",
                self.dimensions
            )));
        }
        Ok(())
    }
}

/// `<platform cache dir>/tokcache/cache.db`, or the temp dir when the platform has none
pub fn default_store_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tokcache")
        .join(DEFAULT_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_memory_items, 1000);
        assert!(config.semantic.is_none());
        assert!(config.semantic_enabled().is_none());
        assert!(config.validate().is_ok());
        assert!(config.resolved_store_path().ends_with("tokcache/cache.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CacheConfig::from_toml_str(
            r#"
            max_memory_items = 50

            [semantic]
            similarity_threshold = 0.6
            "#,
        )
        .unwrap();

        assert_eq!(config.max_memory_items, 50);
        assert_eq!(config.memory_ttl_secs, 3600);
        let semantic = config.semantic_enabled().unwrap();
        assert_eq!(semantic.similarity_threshold, 0.6);
        assert_eq!(semantic.top_k, 5);
        assert_eq!(semantic.dimensions, 128);
    }

    #[test]
    fn test_disabled_semantic_section() {
        let config = CacheConfig::from_toml_str("[semantic]\nenabled = false\n").unwrap();
        assert!(config.semantic.is_some());
        assert!(config.semantic_enabled().is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CacheConfig::from_toml_str("max_memory_items = 0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));

        let err =
            CacheConfig::from_toml_str("[semantic]\nsimilarity_threshold = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));

        let err = CacheConfig::from_toml_str("[semantic]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_k"));

        let nan = SemanticConfig {
            similarity_threshold: f32::NAN,
            ..SemanticConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokcache.toml");
        std::fs::write(&path, "store_path = \"/srv/cache.db\"\nbusy_timeout_ms = 250\n").unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.store_path, Some(PathBuf::from("/srv/cache.db")));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));

        let missing = CacheConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, CoreError::ConfigRead { .. }));

        std::fs::write(&path, "max_memory_items = \"lots\"").unwrap();
        let bad = CacheConfig::load(&path).unwrap_err();
        assert!(matches!(bad, CoreError::ConfigParse { .. }));
    }
}
