use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Library;
use crate::error::LibraryError;
use crate::host::RescanMode;
use crate::ledger::{LedgerFilter, LibraryItem, MediaKind};
use crate::removal::{RemovalEvent, RemovalTarget};

impl Library {
    /// Delete a movie's directories. Returns how many were removed.
    pub(crate) async fn remove_movie_artifacts(&self, id: u32) -> Result<usize, LibraryError> {
        let mut dirs = self.index.movie_dirs(id).await;
        if dirs.is_empty() {
            if let Ok(movie) = self.metadata.get_movie(id, &self.config.strm_language).await {
                dirs = self.renderer.movie_dirs(&movie);
            }
        }
        self.remove_paths(&dirs).await
    }

    /// Delete a show's directories. Returns how many were removed.
    pub(crate) async fn remove_show_artifacts(&self, id: u32) -> Result<usize, LibraryError> {
        let mut dirs = self.index.show_dirs(id).await;
        if dirs.is_empty() {
            if let Ok(show) = self.metadata.get_show(id, &self.config.strm_language).await {
                dirs = self.renderer.show_dirs(&show);
            }
        }
        self.remove_paths(&dirs).await
    }

    pub(crate) async fn remove_episode_files(
        &self,
        show_id: u32,
        season: u32,
        episode: u32,
    ) -> Result<usize, LibraryError> {
        let files = self.index.episode_files(show_id, season, episode).await;
        self.remove_paths(&files).await
    }

    async fn remove_paths(&self, paths: &[PathBuf]) -> Result<usize, LibraryError> {
        if paths.is_empty() {
            return Ok(0);
        }
        Ok(self.renderer.remove_artifacts(paths).await?.len())
    }

    /// Mark a show and every known episode of it Deleted in one batch.
    pub(crate) fn mark_show_deleted(&self, show_id: u32) -> Result<(), LibraryError> {
        let filter = LedgerFilter::new()
            .with_kind(MediaKind::Episode)
            .with_show(show_id);
        let mut batch: Vec<LibraryItem> = self
            .ledger
            .find(&filter)?
            .into_iter()
            .map(LibraryItem::deleted)
            .collect();
        batch.push(LibraryItem::show(show_id).deleted());
        self.ledger.save_batch(&batch)?;
        Ok(())
    }

    pub(crate) async fn clean_host(&self) {
        if let Err(e) = self.host.rescan_library(RescanMode::Clean).await {
            warn!("Host library clean failed: {}", e);
        }
    }
}

#[async_trait]
impl RemovalTarget for Library {
    async fn remove_show(&self, show_id: u32) -> Result<(), LibraryError> {
        let removed = self.remove_show_artifacts(show_id).await?;
        debug!("Removed {} directories of show {}", removed, show_id);
        self.mark_show_deleted(show_id)
    }

    async fn remove_episode_artifacts(&self, event: &RemovalEvent) -> Result<bool, LibraryError> {
        let removed = self
            .remove_episode_files(event.show_id, event.season, event.episode)
            .await?;
        Ok(removed > 0)
    }
}
