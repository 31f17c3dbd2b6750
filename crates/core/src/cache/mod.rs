//! Keyed cache with optional expiry.
//!
//! Holds the show sync cursor, list snapshots, bootstrap flags and resolved
//! external ids. Values are stored as JSON text.

mod sqlite;

pub use sqlite::SqliteCache;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Well-known cache keys and prefixes.
pub mod keys {
    /// Show sync cursor (remote id -> last seen update timestamp).
    pub const SHOW_SYNC_CURSOR: &str = "sync.show_cursor";
    /// Per-list-kind bootstrap flag, suffixed with the list kind.
    pub const BOOTSTRAPPED_PREFIX: &str = "sync.bootstrapped.";
    /// Stored list snapshots, suffixed with `<kind>.<list>`.
    pub const LIST_SNAPSHOT_PREFIX: &str = "lists.snapshot.";
    /// Foreign id resolutions, suffixed with `<space>.<kind>.<id>`.
    pub const RESOLVE_PREFIX: &str = "resolve.";
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(String),

    #[error("failed to (de)serialize cached value for {key}: {message}")]
    Serialization { key: String, message: String },
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}

/// Raw string key-value storage with optional TTL.
pub trait KeyValueCache: Send + Sync {
    /// Get a value, treating expired entries as absent.
    fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value. `None` ttl means the entry never expires.
    fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove a single key. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key starting with `prefix`. Returns the number removed.
    fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
}

/// Typed JSON helpers over any [`KeyValueCache`].
pub trait CacheExt: KeyValueCache {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_raw(key, &raw, ttl)
    }
}

impl<C: KeyValueCache + ?Sized> CacheExt for C {}
