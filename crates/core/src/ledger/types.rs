//! Types for the persistent state ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of media a ledger record or artifact refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Show,
    Season,
    Episode,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Season => "season",
            MediaKind::Episode => "episode",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "show" => Ok(MediaKind::Show),
            "season" => Ok(MediaKind::Season),
            "episode" => Ok(MediaKind::Episode),
            other => Err(LedgerError::Database(format!("unknown media kind: {}", other))),
        }
    }
}

/// Lifecycle state of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Deleted,
    Active,
}

impl ItemState {
    pub fn as_i64(&self) -> i64 {
        match self {
            ItemState::Deleted => -1,
            ItemState::Active => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value < 0 {
            ItemState::Deleted
        } else {
            ItemState::Active
        }
    }
}

/// A single ledger record, keyed by `(external_id, media_kind)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub external_id: u32,
    pub media_kind: MediaKind,
    /// Parent show for episodes and seasons; equals `external_id` for shows, 0 for movies.
    pub show_id: u32,
    pub season: u32,
    pub episode: u32,
    pub state: ItemState,
    pub updated_at: DateTime<Utc>,
}

impl LibraryItem {
    pub fn movie(id: u32) -> Self {
        Self::new(id, MediaKind::Movie, 0, 0, 0)
    }

    pub fn show(id: u32) -> Self {
        Self::new(id, MediaKind::Show, id, 0, 0)
    }

    pub fn episode(id: u32, show_id: u32, season: u32, episode: u32) -> Self {
        Self::new(id, MediaKind::Episode, show_id, season, episode)
    }

    fn new(id: u32, media_kind: MediaKind, show_id: u32, season: u32, episode: u32) -> Self {
        Self {
            external_id: id,
            media_kind,
            show_id,
            season,
            episode,
            state: ItemState::Active,
            updated_at: Utc::now(),
        }
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn deleted(self) -> Self {
        self.with_state(ItemState::Deleted)
    }

    pub fn is_deleted(&self) -> bool {
        self.state == ItemState::Deleted
    }
}

/// Filter for listing ledger records.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub media_kind: Option<MediaKind>,
    pub state: Option<ItemState>,
    pub show_id: Option<u32>,
}

impl LedgerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.media_kind = Some(kind);
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_show(mut self, show_id: u32) -> Self {
        self.show_id = Some(show_id);
        self
    }
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{kind} {id} not found in ledger")]
    NotFound { id: u32, kind: MediaKind },

    #[error("invalid ledger record: {0}")]
    InvalidRecord(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}
