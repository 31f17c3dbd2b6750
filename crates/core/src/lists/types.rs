//! Remote list types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which half of the library a remote list feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Movies,
    Shows,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Movies => "movies",
            ListKind::Shows => "shows",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movies" | "movie" => Ok(ListKind::Movies),
            "shows" | "show" => Ok(ListKind::Shows),
            other => Err(format!("unknown list kind: {}", other)),
        }
    }
}

/// Identifies a remote list. Anything other than the two built-ins is a
/// user list slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListId {
    Watchlist,
    Collection,
    Custom(String),
}

impl ListId {
    pub fn as_str(&self) -> &str {
        match self {
            ListId::Watchlist => "watchlist",
            ListId::Collection => "collection",
            ListId::Custom(slug) => slug,
        }
    }
}

impl From<String> for ListId {
    fn from(s: String) -> Self {
        match s.as_str() {
            "watchlist" => ListId::Watchlist,
            "collection" => ListId::Collection,
            _ => ListId::Custom(s),
        }
    }
}

impl From<ListId> for String {
    fn from(id: ListId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers a list entry may carry. Only the remote key is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteIds {
    pub trakt: u64,
    #[serde(default)]
    pub tmdb: Option<u32>,
    #[serde(default)]
    pub imdb: Option<String>,
    #[serde(default)]
    pub tvdb: Option<u32>,
}

/// A single entry of a remote list snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteListItem {
    pub ids: RemoteIds,
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    /// Last modification of the entry on the remote side, when known.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteListItem {
    pub fn remote_key(&self) -> u64 {
        self.ids.trakt
    }
}
