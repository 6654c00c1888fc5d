//! Durable file-backed cache backend
//!
//! Stores entries in a single SQLite database. Expiry is an `expires_at`
//! column enforced on every read; expired rows for a key are deleted on
//! access, and writes opportunistically sweep whatever else has lapsed.

use super::CacheBackend;
use crate::cache::types::CacheEntry;
use crate::error::{Error, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed cache store
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the cache database.
    ///
    /// `None` places it under the per-user cache directory, the same way
    /// the rest of Murmur keeps its per-user state.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let db_path = match path {
            Some(path) => path,
            None => {
                let dir = dirs::cache_dir()
                    .ok_or_else(|| {
                        Error::backend_unavailable("sqlite", "cannot find cache directory")
                    })?
                    .join("murmur");
                std::fs::create_dir_all(&dir).map_err(|e| {
                    Error::backend_unavailable(
                        "sqlite",
                        format!("failed to create {}: {}", dir.display(), e),
                    )
                })?;
                dir.join("response-cache.db")
            }
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::backend_unavailable(
                        "sqlite",
                        format!("failed to create {}: {}", parent.display(), e),
                    )
                })?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| {
            Error::backend_unavailable("sqlite", format!("failed to open database: {}", e))
        })?;

        Self::initialize(conn)
    }

    /// In-memory database, for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::backend_unavailable("sqlite", format!("failed to open in-memory db: {}", e))
        })?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;

             CREATE TABLE IF NOT EXISTS cache_entries (
                 key        TEXT PRIMARY KEY,
                 payload    TEXT NOT NULL,
                 expires_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_cache_expires
                 ON cache_entries(expires_at);",
        )
        .map_err(|e| Error::backend_unavailable("sqlite", format!("failed to init schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::backend_op("sqlite", "mutex poisoned"))
    }
}

impl CacheBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();

        // Drop a lapsed row for this key before reading past it.
        conn.execute(
            "DELETE FROM cache_entries WHERE key = ?1 AND expires_at <= ?2",
            params![key, now],
        )?;

        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => {
                let entry = serde_json::from_str(&raw)
                    .map_err(|e| Error::Serialization(format!("bad cache row: {}", e)))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<()> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();
        let expires_at = now + ttl.as_secs() as i64;
        let payload = serde_json::to_string(entry)?;

        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, payload, expires_at)
             VALUES (?1, ?2, ?3)",
            params![key, payload, expires_at],
        )?;

        // Opportunistic sweep keeps the file from accumulating dead rows.
        conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![now],
        )?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> CacheEntry {
        CacheEntry::new(content, 7, 0.002, "nano")
    }

    #[test]
    fn test_set_get_round_trip() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.set("a", &entry("hello"), Duration::from_secs(60)).unwrap();

        let got = backend.get("a").unwrap().unwrap();
        assert_eq!(got.content, "hello");
        assert_eq!(got.tokens, 7);
        assert_eq!(got.tier, "nano");
    }

    #[test]
    fn test_expired_row_is_deleted_on_read() {
        let backend = SqliteBackend::in_memory().unwrap();

        // Plant a row whose expiry already lapsed, bypassing the write-path
        // sweep, so the read path alone must handle it.
        {
            let conn = backend.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO cache_entries (key, payload, expires_at) VALUES (?1, ?2, ?3)",
                params![
                    "a",
                    serde_json::to_string(&entry("x")).unwrap(),
                    Utc::now().timestamp() - 5
                ],
            )
            .unwrap();
        }

        assert!(backend.get("a").unwrap().is_none());

        // Direct inspection: the row is gone, not merely hidden.
        let conn = backend.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_replace_existing_key() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.set("a", &entry("first"), Duration::from_secs(60)).unwrap();
        backend.set("a", &entry("second"), Duration::from_secs(60)).unwrap();

        let got = backend.get("a").unwrap().unwrap();
        assert_eq!(got.content, "second");
    }

    #[test]
    fn test_delete_and_clear() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.set("a", &entry("1"), Duration::from_secs(60)).unwrap();
        backend.set("b", &entry("2"), Duration::from_secs(60)).unwrap();

        backend.delete("a").unwrap();
        assert!(backend.get("a").unwrap().is_none());
        assert!(backend.get("b").unwrap().is_some());

        backend.clear().unwrap();
        assert!(backend.get("b").unwrap().is_none());
    }

    #[test]
    fn test_durability_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");

        {
            let backend = SqliteBackend::open(Some(db_path.clone())).unwrap();
            backend
                .set("persisted", &entry("survives"), Duration::from_secs(300))
                .unwrap();
        }

        let reopened = SqliteBackend::open(Some(db_path)).unwrap();
        let got = reopened.get("persisted").unwrap().unwrap();
        assert_eq!(got.content, "survives");
    }
}
