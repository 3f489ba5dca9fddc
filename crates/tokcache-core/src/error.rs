//! Error types for tokcache-core
//!
//! Only store initialization is allowed to fail fatally. Per-operation errors
//! surface genuine I/O failures of the underlying database and are otherwise
//! absent during normal operation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for tokcache operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Store Errors
    // ===================
    #[error("Failed to initialize persistent store after {} attempts:\n{attempts}", .attempts.len())]
    StoreInit { attempts: OpenReport },

    #[error("Database error during {operation}")]
    Database {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Persistent store is closed")]
    StoreClosed,

    // ===================
    // Semantic Errors
    // ===================
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl CoreError {
    pub(crate) fn database(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| CoreError::Database { operation, source }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        CoreError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if this is the fatal initialization failure
    pub fn is_init_failure(&self) -> bool {
        matches!(self, CoreError::StoreInit { .. })
    }
}

/// One attempt of the store initialization ladder
#[derive(Debug, Clone)]
pub struct OpenAttempt {
    /// 1-based attempt number
    pub attempt: u8,
    pub path: PathBuf,
    pub error: String,
}

/// Record of failed attempts made while opening a store
///
/// Kept on success too, so callers can tell a recovered store
/// (corrupted file replaced, temp-dir fallback) from a clean open.
#[derive(Debug, Clone, Default)]
pub struct OpenReport {
    pub attempts: Vec<OpenAttempt>,
}

impl OpenReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, attempt: u8, path: impl Into<PathBuf>, error: impl fmt::Display) {
        self.attempts.push(OpenAttempt {
            attempt,
            path: path.into(),
            error: error.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Returns true if the store only opened after at least one failure
    pub fn recovered(&self) -> bool {
        !self.attempts.is_empty()
    }

    /// Error message of the most recent failed attempt
    pub fn last_error(&self) -> Option<&str> {
        self.attempts.last().map(|a| a.error.as_str())
    }
}

impl fmt::Display for OpenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.attempts.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  attempt {} ({}): {}", a.attempt, a.path.display(), a.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_report_aggregates_attempts() {
        let mut report = OpenReport::new();
        report.record(1, "/data/cache.db", "file is not a database");
        report.record(2, "/data/cache.db", "permission denied");
        report.record(3, "/tmp/tokcache-x/cache.db", "disk I/O error");

        assert_eq!(report.len(), 3);
        assert!(report.recovered());
        assert_eq!(report.last_error(), Some("disk I/O error"));

        let err = CoreError::StoreInit { attempts: report };
        let message = err.to_string();
        assert!(message.contains("after 3 attempts"));
        assert!(message.contains("/data/cache.db"));
        assert!(message.contains("/tmp/tokcache-x/cache.db"));
        assert!(message.ends_with("disk I/O error"));
        assert!(err.is_init_failure());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = CoreError::DimensionMismatch {
            expected: 128,
            actual: 64,
        };
        assert_eq!(err.to_string(), "Vector dimension mismatch: expected 128, got 64");
        assert!(!err.is_init_failure());
    }
}
