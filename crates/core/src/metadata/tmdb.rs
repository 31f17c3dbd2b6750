//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Episode, IdSpace, Movie, Season, SeasonSummary, Show};
use super::{MetadataError, MetadataProvider};
use crate::ledger::MediaKind;

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let response = Self::check_status(response, what).await?;

        response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse {} response: {}", what, e))
        })
    }

    async fn check_status(response: Response, what: &str) -> Result<Response, MetadataError> {
        let status = response.status();
        if status == 404 {
            return Err(MetadataError::NotFound(what.to_string()));
        }
        if status == 429 {
            return Err(MetadataError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn get_movie(&self, id: u32, language: &str) -> Result<Movie, MetadataError> {
        debug!("TMDB get movie: id={}, language={}", id, language);

        let details: TmdbMovieDetails = self
            .get_json(
                &format!("/movie/{}", id),
                &[("language", language)],
                &format!("movie {}", id),
            )
            .await?;

        Ok(details.into())
    }

    async fn get_show(&self, id: u32, language: &str) -> Result<Show, MetadataError> {
        debug!("TMDB get show: id={}, language={}", id, language);

        let details: TmdbTvDetails = self
            .get_json(
                &format!("/tv/{}", id),
                &[("language", language), ("append_to_response", "external_ids")],
                &format!("show {}", id),
            )
            .await?;

        Ok(details.into())
    }

    async fn get_season(
        &self,
        show_id: u32,
        season: u32,
        language: &str,
    ) -> Result<Season, MetadataError> {
        debug!("TMDB get season: show={}, season={}", show_id, season);

        let details: TmdbSeasonDetails = self
            .get_json(
                &format!("/tv/{}/season/{}", show_id, season),
                &[("language", language)],
                &format!("show {} season {}", show_id, season),
            )
            .await?;

        Ok(details.into())
    }

    async fn resolve_external_id(
        &self,
        foreign_id: &str,
        space: IdSpace,
        kind: MediaKind,
    ) -> Result<Vec<u32>, MetadataError> {
        debug!(
            "TMDB find: id={}, space={}, kind={}",
            foreign_id,
            space.as_str(),
            kind
        );

        let source = match space {
            IdSpace::Imdb => "imdb_id",
            IdSpace::Tvdb => "tvdb_id",
        };
        let found: TmdbFindResponse = self
            .get_json(
                &format!("/find/{}", urlencoding::encode(foreign_id)),
                &[("external_source", source)],
                &format!("{} id {}", space.as_str(), foreign_id),
            )
            .await?;

        let ids = match kind {
            MediaKind::Movie => found.movie_results.iter().map(|r| r.id).collect(),
            _ => found.tv_results.iter().map(|r| r.id).collect(),
        };
        Ok(ids)
    }
}

// ============================================================================
// TMDB API response types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    id: u32,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetails {
    id: u32,
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonResult>,
    #[serde(default)]
    external_ids: Option<TmdbExternalIds>,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonResult {
    season_number: u32,
    episode_count: Option<u32>,
    air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonDetails {
    season_number: u32,
    #[serde(default)]
    episodes: Vec<TmdbEpisodeResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisodeResult {
    id: u32,
    season_number: Option<u32>,
    episode_number: u32,
    #[serde(default)]
    name: String,
    air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbIdResult>,
    #[serde(default)]
    tv_results: Vec<TmdbIdResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbIdResult {
    id: u32,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbMovieDetails> for Movie {
    fn from(d: TmdbMovieDetails) -> Self {
        Self {
            id: d.id,
            title: d.title,
            original_title: d.original_title,
            release_date: d.release_date,
            imdb_id: d.imdb_id.filter(|s| !s.is_empty()),
        }
    }
}

impl From<TmdbTvDetails> for Show {
    fn from(d: TmdbTvDetails) -> Self {
        let (imdb_id, tvdb_id) = match d.external_ids {
            Some(ids) => (ids.imdb_id.filter(|s| !s.is_empty()), ids.tvdb_id),
            None => (None, None),
        };
        Self {
            id: d.id,
            name: d.name,
            original_name: d.original_name,
            first_air_date: d.first_air_date,
            imdb_id,
            tvdb_id,
            seasons: d
                .seasons
                .into_iter()
                .map(|s| SeasonSummary {
                    season_number: s.season_number,
                    episode_count: s.episode_count.unwrap_or(0),
                    air_date: s.air_date,
                })
                .collect(),
        }
    }
}

impl From<TmdbSeasonDetails> for Season {
    fn from(d: TmdbSeasonDetails) -> Self {
        let season_number = d.season_number;
        Self {
            season_number,
            episodes: d
                .episodes
                .into_iter()
                .map(|e| Episode {
                    id: e.id,
                    season_number: e.season_number.unwrap_or(season_number),
                    episode_number: e.episode_number,
                    name: e.name,
                    air_date: e.air_date,
                })
                .collect(),
        }
    }
}
