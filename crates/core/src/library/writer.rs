use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::Library;
use crate::error::LibraryError;
use crate::ledger::{LibraryItem, MediaKind};
use crate::metadata::{has_aired, Episode, Movie, Show};
use crate::render::{RenderOptions, ShowRender};
use crate::sync::ContentWriter;

impl Library {
    fn ensure_not_removed(&self, id: u32, kind: MediaKind, force: bool) -> Result<(), LibraryError> {
        if !force && self.ledger.is_marked_deleted(id, kind) {
            return Err(LibraryError::VideoRemoved { kind, id });
        }
        Ok(())
    }

    /// Episodes of `show` that pass the season and air-date filters.
    async fn eligible_episodes(&self, show: &Show) -> Result<Vec<Episode>, LibraryError> {
        let today = Utc::now().date_naive();
        let mut episodes = Vec::new();

        for summary in &show.seasons {
            if summary.episode_count == 0 {
                continue;
            }
            if summary.season_number == 0 && !self.config.include_specials {
                continue;
            }
            if !self.config.include_unaired_seasons
                && !has_aired(summary.air_date.as_deref(), today)
            {
                debug!(
                    "Skipping unaired season {} of {}",
                    summary.season_number, show.name
                );
                continue;
            }

            let season = match self
                .metadata
                .get_season(show.id, summary.season_number, &self.config.strm_language)
                .await
            {
                Ok(season) => season,
                Err(e) if e.is_retryable() => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "Skipping season {} of {}: {}",
                        summary.season_number, show.name, e
                    );
                    continue;
                }
            };

            episodes.extend(season.episodes.into_iter().filter(|e| {
                self.config.include_unaired_episodes || has_aired(e.air_date.as_deref(), today)
            }));
        }
        Ok(episodes)
    }
}

#[async_trait]
impl ContentWriter for Library {
    async fn write_movie(&self, id: u32, force: bool) -> Result<Movie, LibraryError> {
        self.ensure_not_removed(id, MediaKind::Movie, force)?;
        let movie = self
            .metadata
            .get_movie(id, &self.config.strm_language)
            .await?;
        self.renderer
            .render_movie(&movie, RenderOptions { force })
            .await?;
        Ok(movie)
    }

    async fn write_show(&self, id: u32, adding: bool, force: bool) -> Result<Show, LibraryError> {
        self.ensure_not_removed(id, MediaKind::Show, force)?;
        let show = self
            .metadata
            .get_show(id, &self.config.strm_language)
            .await?;
        let eligible = self.eligible_episodes(&show).await?;

        if adding {
            let reactivated: Vec<LibraryItem> = eligible
                .iter()
                .map(|e| LibraryItem::episode(e.id, id, e.season_number, e.episode_number))
                .collect();
            self.ledger.save_batch(&reactivated)?;
        }

        let mut episodes: Vec<Episode> = Vec::with_capacity(eligible.len());
        for e in eligible {
            if !force
                && self
                    .index
                    .is_duplicate_episode(id, e.season_number, e.episode_number)
                    .await
            {
                continue;
            }
            if !(adding || force) && self.ledger.is_marked_deleted(e.id, MediaKind::Episode) {
                continue;
            }
            episodes.push(e);
        }

        let request = ShowRender {
            show: &show,
            episodes: &episodes,
            existing_dir: self.index.show_dirs(id).await.into_iter().next(),
        };
        self.renderer
            .render_show(&request, RenderOptions { force })
            .await?;
        Ok(show)
    }
}
