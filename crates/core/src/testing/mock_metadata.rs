//! Mock metadata provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ledger::MediaKind;
use crate::metadata::{IdSpace, MetadataError, MetadataProvider, Movie, Season, Show};

/// A recorded external id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResolve {
    pub foreign_id: String,
    pub space: IdSpace,
    pub kind: MediaKind,
}

/// Mock implementation of the MetadataProvider trait.
///
/// Serves movies, shows and seasons registered up front, records
/// id lookups, and can fail the next request.
#[derive(Debug, Default)]
pub struct MockMetadataProvider {
    movies: Arc<RwLock<HashMap<u32, Movie>>>,
    shows: Arc<RwLock<HashMap<u32, Show>>>,
    /// Seasons by (show_id, season_number).
    seasons: Arc<RwLock<HashMap<(u32, u32), Season>>>,
    resolutions: Arc<RwLock<HashMap<(IdSpace, String, MediaKind), u32>>>,
    resolves: Arc<RwLock<Vec<RecordedResolve>>>,
    /// Languages requested, in order.
    languages: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<MetadataError>>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.movies.write().await.insert(movie.id, movie);
    }

    pub async fn add_show(&self, show: Show) {
        self.shows.write().await.insert(show.id, show);
    }

    pub async fn add_season(&self, show_id: u32, season: Season) {
        self.seasons
            .write()
            .await
            .insert((show_id, season.season_number), season);
    }

    pub async fn add_resolution(&self, space: IdSpace, foreign_id: &str, kind: MediaKind, id: u32) {
        self.resolutions
            .write()
            .await
            .insert((space, foreign_id.to_string(), kind), id);
    }

    /// Make the next request fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_resolves(&self) -> Vec<RecordedResolve> {
        self.resolves.read().await.clone()
    }

    pub async fn requested_languages(&self) -> Vec<String> {
        self.languages.read().await.clone()
    }

    async fn begin(&self, language: &str) -> Result<(), MetadataError> {
        self.languages.write().await.push(language.to_string());
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn get_movie(&self, id: u32, language: &str) -> Result<Movie, MetadataError> {
        self.begin(language).await?;
        self.movies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("movie {}", id)))
    }

    async fn get_show(&self, id: u32, language: &str) -> Result<Show, MetadataError> {
        self.begin(language).await?;
        self.shows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("show {}", id)))
    }

    async fn get_season(
        &self,
        show_id: u32,
        season: u32,
        language: &str,
    ) -> Result<Season, MetadataError> {
        self.begin(language).await?;
        self.seasons
            .read()
            .await
            .get(&(show_id, season))
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("show {} season {}", show_id, season)))
    }

    async fn resolve_external_id(
        &self,
        foreign_id: &str,
        space: IdSpace,
        kind: MediaKind,
    ) -> Result<Vec<u32>, MetadataError> {
        self.resolves.write().await.push(RecordedResolve {
            foreign_id: foreign_id.to_string(),
            space,
            kind,
        });
        Ok(self
            .resolutions
            .read()
            .await
            .get(&(space, foreign_id.to_string(), kind))
            .map(|id| vec![*id])
            .unwrap_or_default())
    }
}
