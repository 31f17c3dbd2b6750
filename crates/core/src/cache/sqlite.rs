//! SQLite-backed cache, sharing the database file with the ledger.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{CacheError, KeyValueCache};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        // The ledger and the cache share one database file.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_kv_cache_expires ON kv_cache(expires_at);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("cache connection lock poisoned".to_string()))
    }
}

impl KeyValueCache for SqliteCache {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock()?;
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, Some(expires_at))) if expires_at <= Utc::now().timestamp_millis() => {
                debug!("Cache entry {} expired", key);
                conn.execute("DELETE FROM kv_cache WHERE key = ?1", params![key])?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at =
            ttl.map(|ttl| Utc::now().timestamp_millis() + ttl.as_millis().min(i64::MAX as u128) as i64);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_cache (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM kv_cache WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM kv_cache WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        Ok(affected)
    }
}
