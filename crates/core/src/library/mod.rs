//! Library facade.
//!
//! [`Library`] is what the application layer talks to. It owns the
//! collaborators and implements the seams the background machinery calls
//! back into: [`ContentWriter`] for the sync drivers, [`RemovalTarget`] for
//! the removal worker and [`RefreshRunner`] for the coordinator.

mod maintenance;
mod remove;
mod writer;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::KeyValueCache;
use crate::config::{LibraryConfig, SyncConfig};
use crate::error::LibraryError;
use crate::host::HostControl;
use crate::index::DuplicateIndex;
use crate::ledger::{LedgerFilter, LibraryItem, MediaKind, StateLedger};
use crate::lists::{ListId, ListKind, ListProvider};
use crate::metadata::{MetadataProvider, Movie, Show};
use crate::refresh::{RefreshKind, RefreshState};
use crate::removal::{RemovalEvent, RemovalQueue};
use crate::render::{Renderer, MOVIES_DIR, SHOWS_DIR};
use crate::sync::{ContentWriter, SyncDriver, SyncOptions, SyncReport};

/// The collaborators a [`Library`] is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn StateLedger>,
    pub index: Arc<dyn DuplicateIndex>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub lists: Arc<dyn ListProvider>,
    pub renderer: Arc<dyn Renderer>,
    pub host: Arc<dyn HostControl>,
    pub cache: Arc<dyn KeyValueCache>,
}

pub struct Library {
    config: LibraryConfig,
    ledger: Arc<dyn StateLedger>,
    index: Arc<dyn DuplicateIndex>,
    metadata: Arc<dyn MetadataProvider>,
    renderer: Arc<dyn Renderer>,
    host: Arc<dyn HostControl>,
    cache: Arc<dyn KeyValueCache>,
    sync: SyncDriver,
    refresh: RefreshState,
    removals: RemovalQueue,
    closed: AtomicBool,
}

impl Library {
    pub fn new(
        config: LibraryConfig,
        sync: SyncConfig,
        collaborators: Collaborators,
        refresh: RefreshState,
        removals: RemovalQueue,
    ) -> Self {
        let sync = SyncDriver::new(sync, config.update_policy, &collaborators, refresh.clone());
        Self {
            config,
            ledger: collaborators.ledger,
            index: collaborators.index,
            metadata: collaborators.metadata,
            renderer: collaborators.renderer,
            host: collaborators.host,
            cache: collaborators.cache,
            sync,
            refresh,
            removals,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn refresh_state(&self) -> &RefreshState {
        &self.refresh
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make sure the library root exists and holds the media directories.
    pub async fn check_paths(&self) -> Result<(), LibraryError> {
        let root = &self.config.path;
        if root.as_os_str().is_empty() {
            return Err(LibraryError::InvalidPath("library path is not set".to_string()));
        }
        if !root.is_dir() {
            return Err(LibraryError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        for name in [MOVIES_DIR, SHOWS_DIR] {
            let dir = root.join(name);
            create_dir(&dir).await?;
        }
        debug!("Library paths ready under {}", root.display());
        Ok(())
    }

    /// Add a movie on explicit user request.
    ///
    /// Re-activates a removed movie. Fails with `AlreadyExists` when the
    /// movie is present locally and `force` is not set.
    pub async fn request_add_movie(&self, id: u32, force: bool) -> Result<Movie, LibraryError> {
        if !force && self.index.is_duplicate_movie(id).await {
            return Err(LibraryError::AlreadyExists {
                kind: MediaKind::Movie,
                id,
            });
        }

        let prior = self.activate(LibraryItem::movie(id))?;
        match self.write_movie(id, force).await {
            Ok(movie) => {
                info!("Added movie {} ({})", movie.title, id);
                self.announce_added(&movie.title).await;
                Ok(movie)
            }
            Err(e) => {
                self.restore(id, MediaKind::Movie, prior);
                Err(e)
            }
        }
    }

    /// Add a show on explicit user request. Its episodes are re-activated.
    pub async fn request_add_show(&self, id: u32, force: bool) -> Result<Show, LibraryError> {
        if !force && self.index.is_duplicate_show(id).await {
            return Err(LibraryError::AlreadyExists {
                kind: MediaKind::Show,
                id,
            });
        }

        let prior = self.activate(LibraryItem::show(id))?;
        match self.write_show(id, true, force).await {
            Ok(show) => {
                info!("Added show {} ({})", show.name, id);
                self.announce_added(&show.name).await;
                Ok(show)
            }
            Err(e) => {
                self.restore(id, MediaKind::Show, prior);
                Err(e)
            }
        }
    }

    /// Save the item Active, returning the record it replaced.
    fn activate(&self, item: LibraryItem) -> Result<Option<LibraryItem>, LibraryError> {
        let prior = self.ledger.get(item.external_id, item.media_kind).ok();
        self.ledger.save(&item)?;
        Ok(prior)
    }

    fn restore(&self, id: u32, kind: MediaKind, prior: Option<LibraryItem>) {
        let result = match prior {
            Some(item) => self.ledger.save(&item),
            None => self.ledger.delete(id, kind),
        };
        if let Err(e) = result {
            warn!("Failed to restore ledger record for {} {}: {}", kind, id, e);
        }
    }

    async fn announce_added(&self, name: &str) {
        self.host.notify(&format!("Added to library: {}", name)).await;
        self.refresh.request(RefreshKind::HostLibrary);
    }

    /// Remove a movie's artifacts and mark it removed.
    pub async fn request_remove_movie(&self, id: u32) -> Result<(), LibraryError> {
        let removed = self.remove_movie_artifacts(id).await?;
        self.ledger.save(&LibraryItem::movie(id).deleted())?;
        if removed == 0 {
            return Err(LibraryError::NotFound(format!("movie {} has no artifacts", id)));
        }
        info!("Removed movie {}", id);
        self.clean_host().await;
        Ok(())
    }

    /// Remove a show's artifacts and mark it and its episodes removed.
    pub async fn request_remove_show(&self, id: u32) -> Result<(), LibraryError> {
        let removed = self.remove_show_artifacts(id).await?;
        self.mark_show_deleted(id)?;
        if removed == 0 {
            return Err(LibraryError::NotFound(format!("show {} has no artifacts", id)));
        }
        info!("Removed show {}", id);
        self.clean_host().await;
        Ok(())
    }

    /// Queue an episode for removal.
    ///
    /// The file is deleted and the ledger updated when the removal worker
    /// flushes. When no file exists the removal is still recorded, and
    /// `NotFound` reports that nothing was left to delete.
    pub async fn request_remove_episode(
        &self,
        id: u32,
        show_id: u32,
        season: u32,
        episode: u32,
    ) -> Result<(), LibraryError> {
        let present = self.index.is_duplicate_episode(show_id, season, episode).await;
        let show_name = match self.metadata.get_show(show_id, &self.config.language).await {
            Ok(show) => show.name,
            Err(e) => {
                debug!("Could not look up show {}: {}", show_id, e);
                format!("Show {}", show_id)
            }
        };

        let event = RemovalEvent {
            episode_id: id,
            show_id,
            show_name,
            season,
            episode,
        };
        let label = event.label();
        if !self.removals.send(event) {
            return Err(LibraryError::ShuttingDown);
        }

        if !present {
            return Err(LibraryError::NotFound(format!("{} has no artifact", label)));
        }
        debug!("Queued removal of {}", label);
        Ok(())
    }

    /// Sync one remote list now.
    pub async fn request_sync(
        &self,
        kind: ListKind,
        list: &ListId,
        options: SyncOptions,
    ) -> Result<SyncReport, LibraryError> {
        self.sync.sync(self, kind, list, options).await
    }

    /// Mark a refresh kind Pending.
    pub fn request_refresh(&self, kind: RefreshKind) {
        self.refresh.request(kind);
    }

    /// Queue a show for the next Episodes refresh.
    pub fn request_show_update(&self, show_id: u32) {
        self.refresh.plan_show_update(show_id);
    }

    /// Delete every cached entry under a key prefix.
    pub fn clear_cache(&self, prefix: &str) -> Result<usize, LibraryError> {
        let removed = self.cache.delete_prefix(prefix)?;
        info!("Cleared {} cache entries under '{}'", removed, prefix);
        Ok(removed)
    }

    pub fn clear_cache_key(&self, key: &str) -> Result<bool, LibraryError> {
        Ok(self.cache.delete(key)?)
    }

    pub fn list_items(&self, filter: &LedgerFilter) -> Result<Vec<LibraryItem>, LibraryError> {
        Ok(self.ledger.find(filter)?)
    }
}

async fn create_dir(dir: &Path) -> Result<(), LibraryError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| LibraryError::InvalidPath(format!("cannot create {}: {}", dir.display(), e)))
}
