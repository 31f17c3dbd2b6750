//! Background passes: the ledger sweep and the refresh kinds.

use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Library;
use crate::error::LibraryError;
use crate::host::RescanMode;
use crate::ledger::{ItemState, LedgerFilter, LibraryItem, MediaKind};
use crate::lists::{ListId, ListKind};
use crate::metrics;
use crate::refresh::{RefreshKind, RefreshRunner};
use crate::sync::{ContentWriter, SyncOptions};

impl Library {
    /// Clear Deleted ledger records, removing artifacts that are still on disk.
    ///
    /// A record whose artifacts could not be removed stays for the next sweep.
    pub async fn sweep(&self) -> Result<usize, LibraryError> {
        let deleted = self
            .ledger
            .find(&LedgerFilter::new().with_state(ItemState::Deleted))?;

        let mut cleared = 0;
        for item in deleted {
            if self.is_closed() {
                break;
            }
            if let Err(e) = self.sweep_artifacts(&item).await {
                warn!(
                    "Sweep could not remove {} {}: {}",
                    item.media_kind, item.external_id, e
                );
                continue;
            }
            match self.ledger.delete(item.external_id, item.media_kind) {
                Ok(()) => cleared += 1,
                Err(e) => warn!(
                    "Sweep could not clear {} {}: {}",
                    item.media_kind, item.external_id, e
                ),
            }
        }

        if cleared > 0 {
            metrics::SWEEP_REMOVED.inc_by(cleared as u64);
            info!("Sweep cleared {} removed items", cleared);
        }
        Ok(cleared)
    }

    async fn sweep_artifacts(&self, item: &LibraryItem) -> Result<(), LibraryError> {
        let id = item.external_id;
        match item.media_kind {
            MediaKind::Movie => {
                if self.index.is_duplicate_movie(id).await {
                    self.remove_movie_artifacts(id).await?;
                }
            }
            MediaKind::Show => {
                if self.index.is_duplicate_show(id).await {
                    self.remove_show_artifacts(id).await?;
                }
            }
            MediaKind::Episode => {
                if self
                    .index
                    .is_duplicate_episode(item.show_id, item.season, item.episode)
                    .await
                {
                    self.remove_episode_files(item.show_id, item.season, item.episode)
                        .await?;
                }
            }
            MediaKind::Season => {}
        }
        Ok(())
    }

    /// Render Active movies whose artifacts went missing.
    async fn restore_movies(&self) -> Result<(), LibraryError> {
        let movies = self.active(MediaKind::Movie)?;
        let mut restored = 0;
        for item in movies {
            if self.is_closed() {
                break;
            }
            if self.index.is_duplicate_movie(item.external_id).await {
                continue;
            }
            match self.write_movie(item.external_id, false).await {
                Ok(_) => restored += 1,
                Err(e) => warn!("Failed to restore movie {}: {}", item.external_id, e),
            }
        }
        debug!("Restored {} movies", restored);
        Ok(())
    }

    /// Re-render every Active show, picking up new episodes.
    async fn update_shows(&self) -> Result<(), LibraryError> {
        let ids: Vec<u32> = self
            .active(MediaKind::Show)?
            .into_iter()
            .map(|item| item.external_id)
            .collect();
        if !ids.is_empty() {
            self.render_shows(&ids).await;
            self.refresh.request(RefreshKind::HostLibrary);
        }
        Ok(())
    }

    async fn update_pending_shows(&self) -> Result<(), LibraryError> {
        let ids = self.refresh.take_pending_shows();
        if !ids.is_empty() {
            self.render_shows(&ids).await;
            self.refresh.request(RefreshKind::HostLibrary);
        }
        Ok(())
    }

    async fn render_shows(&self, ids: &[u32]) {
        for &id in ids {
            if self.is_closed() {
                break;
            }
            if let Err(e) = self.write_show(id, false, false).await {
                warn!("Failed to update show {}: {}", id, e);
            }
        }
    }

    fn active(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, LibraryError> {
        let filter = LedgerFilter::new()
            .with_kind(kind)
            .with_state(ItemState::Active);
        Ok(self.ledger.find(&filter)?)
    }

    /// Sync every configured list. Failures are collected, not short-circuited.
    async fn sync_all_lists(&self) -> Result<(), LibraryError> {
        let config = self.sync.config();
        let lists: Vec<(ListKind, ListId)> = config
            .movie_lists
            .iter()
            .map(|l| (ListKind::Movies, l.clone()))
            .chain(config.show_lists.iter().map(|l| (ListKind::Shows, l.clone())))
            .collect();

        let total = lists.len();
        let mut failures = Vec::new();
        for (kind, list) in lists {
            if self.is_closed() {
                break;
            }
            if let Err(e) = self
                .sync
                .sync(self, kind, &list, SyncOptions::default())
                .await
            {
                warn!("Sync of {} list {} failed: {}", kind, list, e);
                failures.push(e);
            }
        }

        let failed = failures.len();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) if total == 1 => Err(first),
            Some(first) => Err(LibraryError::Aggregate {
                failed,
                total,
                first: first.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RefreshRunner for Library {
    async fn run_refresh(&self, kind: RefreshKind) -> Result<(), LibraryError> {
        match kind {
            RefreshKind::Overall => {
                self.restore_movies().await?;
                self.update_shows().await
            }
            RefreshKind::Movies => self.restore_movies().await,
            RefreshKind::Shows => self.update_shows().await,
            RefreshKind::Episodes => self.update_pending_shows().await,
            RefreshKind::HostLibrary => Ok(self.host.rescan_library(RescanMode::Scan).await?),
            RefreshKind::RemoteList => self.sync_all_lists().await,
        }
    }

    async fn run_maintenance(&self) -> Result<usize, LibraryError> {
        self.sweep().await
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
