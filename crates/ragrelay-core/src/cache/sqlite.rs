//! SQLite-backed response cache

use super::CacheStore;
use crate::error::Result;
use crate::fingerprint::CacheKey;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_TABLES: &str = r#"
-- Completed provider responses, keyed by request fingerprint
CREATE TABLE IF NOT EXISTS response_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Persistent key-value store for completed responses
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) the cache at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory cache (testing and ephemeral runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM response_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove all entries, returning how many were deleted
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn();
        let rows = conn.execute("DELETE FROM response_cache", [])?;
        Ok(rows)
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT value FROM response_cache WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &CacheKey, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO response_cache (key, value, created_at) VALUES (?1, ?2, ?3)",
            params![key.as_str(), value, now],
        )?;

        if rows == 0 {
            // Key already present: idempotent when equal, anomaly otherwise.
            let existing: Option<String> = match conn.query_row(
                "SELECT value FROM response_cache WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            ) {
                Ok(value) => Some(value),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };

            if existing.as_deref().is_some_and(|stored| stored != value) {
                tracing::warn!(
                    target: "ragrelay::cache",
                    key = %key,
                    "cache anomaly: same key observed with a different value; keeping the stored entry"
                );
            }
        }

        Ok(())
    }
}
