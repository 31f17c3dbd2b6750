//! Testing utilities and mock implementations of the collaborator traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use vlibrary_core::testing::{fixtures, MockHost, MockMetadataProvider};
//!
//! let metadata = MockMetadataProvider::new();
//! metadata.add_movie(fixtures::movie(603, "The Matrix", 1999)).await;
//!
//! let host = MockHost::new();
//! host.set_confirm_answer(false).await;
//! ```

mod mock_host;
mod mock_index;
mod mock_ledger;
mod mock_lists;
mod mock_metadata;

pub use mock_host::MockHost;
pub use mock_index::MockDuplicateIndex;
pub use mock_ledger::MockLedger;
pub use mock_lists::MockListSource;
pub use mock_metadata::{MockMetadataProvider, RecordedResolve};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::lists::{RemoteIds, RemoteListItem};
    use crate::metadata::{Episode, Movie, Season, SeasonSummary, Show};

    pub fn movie(id: u32, title: &str, year: u32) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            original_title: None,
            release_date: Some(format!("{}-06-15", year)),
            imdb_id: Some(format!("tt{:07}", id)),
        }
    }

    /// A show whose seasons all aired in 2020. `seasons` lists
    /// `(season_number, episode_count)`.
    pub fn show(id: u32, name: &str, seasons: &[(u32, u32)]) -> Show {
        Show {
            id,
            name: name.to_string(),
            original_name: None,
            first_air_date: Some("2020-01-01".to_string()),
            imdb_id: None,
            tvdb_id: None,
            seasons: seasons
                .iter()
                .map(|&(season_number, episode_count)| SeasonSummary {
                    season_number,
                    episode_count,
                    air_date: Some("2020-01-01".to_string()),
                })
                .collect(),
        }
    }

    /// Episode ids are `show_id * 1000 + season * 100 + episode`.
    pub fn season(show_id: u32, season_number: u32, episodes: u32) -> Season {
        Season {
            season_number,
            episodes: (1..=episodes)
                .map(|e| episode(show_id, season_number, e, Some("2020-01-01")))
                .collect(),
        }
    }

    pub fn episode(show_id: u32, season: u32, number: u32, air_date: Option<&str>) -> Episode {
        Episode {
            id: episode_id(show_id, season, number),
            season_number: season,
            episode_number: number,
            name: format!("Episode {}", number),
            air_date: air_date.map(str::to_string),
        }
    }

    pub fn episode_id(show_id: u32, season: u32, number: u32) -> u32 {
        show_id * 1000 + season * 100 + number
    }

    /// A list entry with a canonical id. The remote key is `tmdb + 10_000`.
    pub fn list_item(tmdb: u32, title: &str) -> RemoteListItem {
        RemoteListItem {
            ids: RemoteIds {
                trakt: u64::from(tmdb) + 10_000,
                tmdb: Some(tmdb),
                imdb: None,
                tvdb: None,
            },
            title: title.to_string(),
            year: Some(2020),
            updated_at: None,
        }
    }

    pub fn updated_on(day: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single()
    }
}
