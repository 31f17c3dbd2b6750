//! Trakt API client for watchlists, collections and user lists.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ListError, ListId, ListKind, ListSource, RemoteIds, RemoteListItem};

/// Trakt API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    /// Trakt application client id.
    pub client_id: String,
    /// OAuth access token of the user whose lists are synced.
    pub access_token: String,
    /// Base URL (default: https://api.trakt.tv).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

pub struct TraktClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: String,
}

impl TraktClient {
    pub fn new(config: TraktConfig) -> Result<Self, ListError> {
        if config.client_id.is_empty() || config.access_token.is_empty() {
            return Err(ListError::NotConfigured(
                "Trakt client_id and access_token are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .unwrap_or_else(|| "https://api.trakt.tv".to_string()),
            client_id: config.client_id,
            access_token: config.access_token,
        })
    }

    fn list_path(kind: ListKind, list: &ListId) -> String {
        match list {
            ListId::Watchlist => format!("/sync/watchlist/{}", kind),
            ListId::Collection => format!("/sync/collection/{}", kind),
            ListId::Custom(slug) => format!(
                "/users/me/lists/{}/items/{}",
                urlencoding::encode(slug),
                kind
            ),
        }
    }
}

#[async_trait]
impl ListSource for TraktClient {
    async fn fetch(
        &self,
        kind: ListKind,
        list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError> {
        let url = format!("{}{}", self.base_url, Self::list_path(kind, list));

        debug!("Trakt fetch: kind={}, list={}", kind, list);

        let response = self
            .client
            .get(&url)
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.client_id)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if status == 404 {
            return Err(ListError::NotFound(format!("{} list {}", kind, list)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ListError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let entries: Vec<TraktListEntry> = response.json().await.map_err(|e| {
            ListError::ParseError(format!("Failed to parse list response: {}", e))
        })?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.into_item(kind))
            .collect())
    }
}

// ============================================================================
// Trakt API response types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TraktListEntry {
    #[serde(default)]
    movie: Option<TraktMedia>,
    #[serde(default)]
    show: Option<TraktMedia>,
    /// Set on collection entries.
    #[serde(default)]
    last_updated_at: Option<DateTime<Utc>>,
    /// Set on watchlist and list entries.
    #[serde(default)]
    listed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TraktMedia {
    title: Option<String>,
    year: Option<u32>,
    ids: TraktIds,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TraktIds {
    trakt: u64,
    tmdb: Option<u32>,
    imdb: Option<String>,
    tvdb: Option<u32>,
}

impl TraktListEntry {
    fn into_item(self, kind: ListKind) -> Option<RemoteListItem> {
        let media = match kind {
            ListKind::Movies => self.movie?,
            ListKind::Shows => self.show?,
        };
        let updated_at = media
            .updated_at
            .or(self.last_updated_at)
            .or(self.listed_at);

        Some(RemoteListItem {
            ids: RemoteIds {
                trakt: media.ids.trakt,
                tmdb: media.ids.tmdb,
                imdb: media.ids.imdb.filter(|s| !s.is_empty()),
                tvdb: media.ids.tvdb,
            },
            title: media.title.unwrap_or_default(),
            year: media.year,
            updated_at,
        })
    }
}
