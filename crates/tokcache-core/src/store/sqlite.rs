//! SQLite persistent store
//!
//! Schema:
//! - cache_entries table: one row per key, payload + sizes + hit count + timestamps
//! - Indexes: last_accessed_at (eviction), hit_count (diagnostics)
//!
//! Opening follows a three-step ladder:
//! 1. open at the configured path
//! 2. delete the file and its `-wal`/`-shm`/`-journal` side files, reopen at the same path
//! 3. open a fresh store inside a new temporary directory
//!
//! Writes are single statements: the upsert never touches `hit_count` or
//! `created_at`, and hits are counted with `hit_count = hit_count + 1`, so
//! concurrent handles on one file cannot lose each other's increments.

use super::PersistentStore;
use crate::config::DEFAULT_DB_FILE;
use crate::error::{CoreError, OpenReport, Result};
use crate::models::entry::{from_millis, now_millis};
use crate::models::{CacheEntry, StoreAggregates};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        compressed_size INTEGER NOT NULL,
        original_size INTEGER NOT NULL,
        hit_count INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        last_accessed_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_last_accessed ON cache_entries(last_accessed_at);
    CREATE INDEX IF NOT EXISTS idx_hit_count ON cache_entries(hit_count);
"#;

const ENTRY_COLUMNS: &str =
    "key, value, compressed_size, original_size, hit_count, created_at, last_accessed_at";

const SIDE_FILE_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Failure of a single open attempt
#[derive(Debug, Error)]
enum AttemptError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// SQLite-backed [`PersistentStore`] (thread-safe)
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
    open_report: OpenReport,
}

impl SqliteStore {
    /// Open or create the store, walking the recovery ladder on failure
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let mut report = OpenReport::new();

        match open_connection(path, busy_timeout) {
            Ok(conn) => return Ok(Self::ready(conn, path.to_path_buf(), report)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open cache store, removing store files");
                report.record(1, path, e);
            }
        }

        match remove_store_files(path).and_then(|()| open_connection(path, busy_timeout)) {
            Ok(conn) => return Ok(Self::ready(conn, path.to_path_buf(), report)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to recreate cache store, falling back to temp dir");
                report.record(2, path, e);
            }
        }

        let fallback = tempfile::Builder::new()
            .prefix("tokcache-")
            .tempdir()
            .map(|dir| dir.keep().join(DEFAULT_DB_FILE));

        match fallback {
            Ok(temp_path) => match open_connection(&temp_path, busy_timeout) {
                Ok(conn) => {
                    warn!(path = %temp_path.display(), "Cache store opened in temp dir, contents will not outlive it");
                    Ok(Self::ready(conn, temp_path, report))
                }
                Err(e) => {
                    report.record(3, temp_path, e);
                    Err(CoreError::StoreInit { attempts: report })
                }
            },
            Err(e) => {
                report.record(3, std::env::temp_dir(), e);
                Err(CoreError::StoreInit { attempts: report })
            }
        }
    }

    fn ready(conn: Connection, path: PathBuf, open_report: OpenReport) -> Self {
        info!(
            path = %path.display(),
            recovered = open_report.recovered(),
            "Cache store initialized"
        );
        Self {
            conn: Mutex::new(Some(conn)),
            path,
            open_report,
        }
    }

    /// Failed attempts that preceded the successful open (empty on a clean open)
    pub fn open_report(&self) -> &OpenReport {
        &self.open_report
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(CoreError::StoreClosed)?;
        f(conn)
    }

    fn scan(&self, order_by: &str, operation: &'static str) -> Result<Vec<CacheEntry>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries ORDER BY {order_by}");
            let mut stmt = conn.prepare(&sql).map_err(CoreError::database(operation))?;
            let rows = stmt
                .query_map([], row_to_entry)
                .map_err(CoreError::database(operation))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(CoreError::database(operation))?);
            }
            Ok(entries)
        })
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> std::result::Result<Connection, AttemptError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;

    // WAL lets readers proceed while a writer commits
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        warn!(mode = %mode, "Cache store not in WAL mode");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA)?;

    // Touch the table so a damaged file fails here rather than on first use
    conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get::<_, i64>(0))?;

    debug!(path = %path.display(), "Cache store connection ready");
    Ok(conn)
}

fn remove_store_files(path: &Path) -> std::result::Result<(), AttemptError> {
    remove_if_exists(path.to_path_buf())?;
    for suffix in SIDE_FILE_SUFFIXES {
        let mut side: OsString = path.as_os_str().to_owned();
        side.push(suffix);
        remove_if_exists(PathBuf::from(side))?;
    }
    Ok(())
}

fn remove_if_exists(path: PathBuf) -> std::io::Result<()> {
    match std::fs::remove_file(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed store file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        key: row.get(0)?,
        value: row.get(1)?,
        compressed_size: row.get::<_, i64>(2)?.max(0) as u64,
        original_size: row.get::<_, i64>(3)?.max(0) as u64,
        hit_count: row.get::<_, i64>(4)?.max(0) as u64,
        created_at: from_millis(row.get(5)?),
        last_accessed_at: from_millis(row.get(6)?),
    })
}

fn to_sql_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

impl PersistentStore for SqliteStore {
    fn upsert(
        &self,
        key: &str,
        value: &str,
        original_size: u64,
        compressed_size: u64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO cache_entries
                    (key, value, compressed_size, original_size, hit_count, created_at, last_accessed_at)
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    compressed_size = excluded.compressed_size,
                    original_size = excluded.original_size,
                    last_accessed_at = excluded.last_accessed_at
                "#,
                params![
                    key,
                    value,
                    to_sql_size(compressed_size),
                    to_sql_size(original_size),
                    now_millis(),
                ],
            )
            .map_err(CoreError::database("upsert"))?;

            debug!(key = %key, compressed_size = compressed_size, "Entry stored");
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE key = ?1"),
                params![key],
                row_to_entry,
            )
            .optional()
            .map_err(CoreError::database("get"))
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map_err(CoreError::database("delete"))?;
            Ok(removed > 0)
        })
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(CoreError::database("delete_many"))?;

            let mut removed = 0;
            {
                let mut stmt = tx
                    .prepare("DELETE FROM cache_entries WHERE key = ?1")
                    .map_err(CoreError::database("delete_many"))?;
                for key in keys {
                    removed += stmt
                        .execute(params![key])
                        .map_err(CoreError::database("delete_many"))?;
                }
            }

            tx.commit().map_err(CoreError::database("delete_many"))?;
            Ok(removed)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries", [])
                .map_err(CoreError::database("clear"))?;
            debug!("Cache store cleared");
            Ok(())
        })
    }

    fn scan_by_recency(&self) -> Result<Vec<CacheEntry>> {
        self.scan("last_accessed_at DESC, key ASC", "scan_by_recency")
    }

    fn scan_by_hits(&self) -> Result<Vec<CacheEntry>> {
        self.scan(
            "hit_count DESC, last_accessed_at DESC, key ASC",
            "scan_by_hits",
        )
    }

    fn increment_hit(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE cache_entries SET hit_count = hit_count + 1, last_accessed_at = ?2 WHERE key = ?1",
                    params![key, now_millis()],
                )
                .map_err(CoreError::database("increment_hit"))?;
            Ok(updated > 0)
        })
    }

    fn aggregates(&self) -> Result<StoreAggregates> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(hit_count), 0),
                       COALESCE(SUM(compressed_size), 0),
                       COALESCE(SUM(original_size), 0)
                FROM cache_entries
                "#,
                [],
                |row| {
                    Ok(StoreAggregates {
                        entry_count: row.get::<_, i64>(0)?.max(0) as u64,
                        hit_sum: row.get::<_, i64>(1)?.max(0) as u64,
                        compressed_sum: row.get::<_, i64>(2)?.max(0) as u64,
                        original_sum: row.get::<_, i64>(3)?.max(0) as u64,
                    })
                },
            )
            .map_err(CoreError::database("aggregates"))
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn vacuum(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("VACUUM", [])
                .map_err(CoreError::database("vacuum"))?;
            debug!("Cache store vacuumed");
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };

        checkpoint(&conn);
        conn.close()
            .map_err(|(_, e)| CoreError::Database {
                operation: "close",
                source: e,
            })?;

        info!(path = %self.path.display(), "Cache store closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

/// Flush the WAL into the main file so it does not grow across restarts
fn checkpoint(conn: &Connection) {
    match conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
        Ok(()) => debug!("WAL checkpoint completed"),
        Err(e) => warn!("Failed to checkpoint WAL: {}", e),
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().as_ref() {
            checkpoint(conn);
        }
    }
}
