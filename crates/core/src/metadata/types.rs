//! Metadata types returned by a [`super::MetadataProvider`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Foreign identifier namespaces that can be resolved to a canonical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSpace {
    Imdb,
    Tvdb,
}

impl IdSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSpace::Imdb => "imdb",
            IdSpace::Tvdb => "tvdb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u32,
    pub title: String,
    pub original_title: Option<String>,
    /// Release date (YYYY-MM-DD).
    pub release_date: Option<String>,
    pub imdb_id: Option<String>,
}

impl Movie {
    pub fn year(&self) -> Option<u32> {
        parse_year(self.release_date.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: u32,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<u32>,
    pub seasons: Vec<SeasonSummary>,
}

impl Show {
    pub fn year(&self) -> Option<u32> {
        parse_year(self.first_air_date.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    pub episode_count: u32,
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub season_number: u32,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u32,
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub air_date: Option<String>,
}

fn parse_year(date: Option<&str>) -> Option<u32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Whether an air date is known and not in the future.
pub fn has_aired(air_date: Option<&str>, today: NaiveDate) -> bool {
    air_date
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(|d| d <= today)
        .unwrap_or(false)
}
