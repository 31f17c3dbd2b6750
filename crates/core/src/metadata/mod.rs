//! Metadata provider integration.
//!
//! The library renders artifacts from canonical movie/show/season metadata
//! and resolves foreign ids (IMDB, TVDB) that arrive from remote lists.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::MediaKind;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl MetadataError {
    pub fn is_retryable(&self) -> bool {
        match self {
            MetadataError::HttpError(_) | MetadataError::RateLimitExceeded => true,
            MetadataError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Source of canonical metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_movie(&self, id: u32, language: &str) -> Result<Movie, MetadataError>;

    async fn get_show(&self, id: u32, language: &str) -> Result<Show, MetadataError>;

    async fn get_season(
        &self,
        show_id: u32,
        season: u32,
        language: &str,
    ) -> Result<Season, MetadataError>;

    /// Resolve a foreign id to canonical ids of the given kind.
    ///
    /// Returns an empty list when nothing matches.
    async fn resolve_external_id(
        &self,
        foreign_id: &str,
        space: IdSpace,
        kind: MediaKind,
    ) -> Result<Vec<u32>, MetadataError>;
}
