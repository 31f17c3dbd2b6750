//! Show sync cursor: last seen remote update time per list entry.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{keys, CacheError, CacheExt, KeyValueCache};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowSyncCursor {
    entries: HashMap<u64, DateTime<Utc>>,
}

impl ShowSyncCursor {
    /// Load the stored cursor. A missing or expired cursor is empty.
    pub fn load(cache: &dyn KeyValueCache) -> Result<Self, CacheError> {
        Ok(cache
            .get_json::<Self>(keys::SHOW_SYNC_CURSOR)?
            .unwrap_or_default())
    }

    pub fn save(&self, cache: &dyn KeyValueCache, ttl: Duration) -> Result<(), CacheError> {
        cache.set_json(keys::SHOW_SYNC_CURSOR, self, Some(ttl))
    }

    /// Whether the entry was already processed at or after `updated_at`.
    ///
    /// Entries without a remote timestamp are never current.
    pub fn is_current(&self, key: u64, updated_at: Option<DateTime<Utc>>) -> bool {
        match (self.entries.get(&key), updated_at) {
            (Some(seen), Some(updated_at)) => updated_at <= *seen,
            _ => false,
        }
    }

    /// Whether the entry was processed before and changed remotely since.
    pub fn is_stale(&self, key: u64, updated_at: Option<DateTime<Utc>>) -> bool {
        match (self.entries.get(&key), updated_at) {
            (Some(seen), Some(updated_at)) => updated_at > *seen,
            _ => false,
        }
    }

    pub fn record(&mut self, key: u64, updated_at: Option<DateTime<Utc>>) {
        if let Some(updated_at) = updated_at {
            self.entries.insert(key, updated_at);
        }
    }

    /// Drop entries for keys no longer on the list.
    pub fn retain_keys(&mut self, keys: &HashSet<u64>) {
        self.entries.retain(|key, _| keys.contains(key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
