use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cursor::ShowSyncCursor;
use super::resolve::IdResolver;
use super::ContentWriter;
use crate::cache::{keys, CacheExt, KeyValueCache};
use crate::config::{BootstrapPolicy, LibraryUpdatePolicy, SyncConfig};
use crate::diff::diff_list;
use crate::error::LibraryError;
use crate::host::HostControl;
use crate::index::DuplicateIndex;
use crate::ledger::{LibraryItem, MediaKind, StateLedger};
use crate::library::Collaborators;
use crate::lists::{ListId, ListKind, ListProvider, RemoteListItem};
use crate::metrics;
use crate::refresh::{RefreshKind, RefreshState};

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Process every entry of the current list and overwrite artifacts.
    pub force: bool,
    /// Ask for a host rescan when the pass added something new.
    pub request_rescan: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force: false,
            request_rescan: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub kind: ListKind,
    pub list: String,
    /// Whether every entry of the current list was considered.
    pub full_list: bool,
    /// Entries considered after diffing.
    pub candidates: usize,
    /// Canonical ids that were not present locally before this pass.
    pub added: Vec<u32>,
    /// Local shows re-rendered because their list entry changed.
    pub refreshed: usize,
    pub duplicates: usize,
    /// Skipped because the user removed them.
    pub removed: usize,
    /// Skipped because nothing changed since the last pass.
    pub unchanged: usize,
    /// Titles that could not be mapped to a canonical id.
    pub unresolved: Vec<String>,
    pub failed: usize,
    pub rescan_requested: bool,
}

impl SyncReport {
    fn new(kind: ListKind, list: &ListId, full_list: bool, candidates: usize) -> Self {
        Self {
            kind,
            list: list.to_string(),
            full_list,
            candidates,
            added: Vec::new(),
            refreshed: 0,
            duplicates: 0,
            removed: 0,
            unchanged: 0,
            unresolved: Vec::new(),
            failed: 0,
            rescan_requested: false,
        }
    }

    fn count(&self, outcome: &str) {
        metrics::SYNC_ITEMS
            .with_label_values(&[self.kind.as_str(), outcome])
            .inc();
    }
}

enum ItemOutcome {
    /// Record Active in the ledger.
    Record(u32),
    Skipped,
    /// Left out of the committed snapshot so the next pass retries it.
    Failed,
}

/// Drives list syncs: diff, resolve, duplicate check, render, record.
pub struct SyncDriver {
    config: SyncConfig,
    update_policy: LibraryUpdatePolicy,
    lists: Arc<dyn ListProvider>,
    ledger: Arc<dyn StateLedger>,
    index: Arc<dyn DuplicateIndex>,
    cache: Arc<dyn KeyValueCache>,
    host: Arc<dyn HostControl>,
    refresh: RefreshState,
    resolver: IdResolver,
}

impl SyncDriver {
    pub fn new(
        config: SyncConfig,
        update_policy: LibraryUpdatePolicy,
        collaborators: &Collaborators,
        refresh: RefreshState,
    ) -> Self {
        Self {
            config,
            update_policy,
            lists: Arc::clone(&collaborators.lists),
            ledger: Arc::clone(&collaborators.ledger),
            index: Arc::clone(&collaborators.index),
            cache: Arc::clone(&collaborators.cache),
            host: Arc::clone(&collaborators.host),
            refresh,
            resolver: IdResolver::new(
                Arc::clone(&collaborators.metadata),
                Arc::clone(&collaborators.cache),
            ),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync one remote list into the library.
    ///
    /// Per-item failures are logged and counted; only provider and ledger
    /// failures fail the pass. The list snapshot is committed last and
    /// leaves out entries that failed, so those come back as candidates on
    /// the next pass.
    pub async fn sync(
        &self,
        writer: &dyn ContentWriter,
        kind: ListKind,
        list: &ListId,
        options: SyncOptions,
    ) -> Result<SyncReport, LibraryError> {
        let previous = self.lists.previous_list(kind, list).await?;
        let current = self.lists.current_list(kind, list).await?;

        let mut cursor = match kind {
            ListKind::Shows => Some(ShowSyncCursor::load(self.cache.as_ref())?),
            ListKind::Movies => None,
        };

        let bootstrapped = self.is_bootstrapped(kind);
        let full_list = options.force
            || (!bootstrapped && self.config.bootstrap_policy == BootstrapPolicy::FullList);
        let candidates = if full_list {
            diff_list(&[], &current, true, |_| false)
        } else {
            let local = match kind {
                ListKind::Movies => self.index.local_movie_ids().await,
                ListKind::Shows => self.index.local_show_ids().await,
            };
            let diffed = diff_list(&previous, &current, bootstrapped, |id| local.contains(&id));
            match &cursor {
                Some(cursor) => with_stale(&diffed, &current, cursor),
                None => diffed,
            }
        };

        let mut report = SyncReport::new(kind, list, full_list, candidates.len());

        let mut saved = Vec::new();
        let mut failed_keys = HashSet::new();
        for item in &candidates {
            match self
                .sync_item(writer, item, &mut report, cursor.as_mut(), options.force)
                .await
            {
                ItemOutcome::Record(id) => saved.push(match kind {
                    ListKind::Movies => LibraryItem::movie(id),
                    ListKind::Shows => LibraryItem::show(id),
                }),
                ItemOutcome::Skipped => {}
                ItemOutcome::Failed => {
                    failed_keys.insert(item.remote_key());
                }
            }
        }

        self.ledger.save_batch(&saved)?;

        if let Some(cursor) = cursor.as_mut() {
            let on_list: HashSet<u64> = current.iter().map(|i| i.remote_key()).collect();
            cursor.retain_keys(&on_list);
            cursor.save(self.cache.as_ref(), self.config.cursor_ttl())?;
        }
        self.mark_bootstrapped(kind)?;

        let handled: Vec<RemoteListItem> = current
            .iter()
            .filter(|i| !failed_keys.contains(&i.remote_key()))
            .cloned()
            .collect();
        self.lists.commit_snapshot(kind, list, &handled).await?;

        if options.request_rescan {
            report.rescan_requested = self.request_rescan(&report).await;
        }

        info!(
            "Synced {} list {}: {} candidates, {} added, {} refreshed, {} duplicates, {} removed, {} unchanged, {} unresolved, {} failed",
            kind,
            list,
            report.candidates,
            report.added.len(),
            report.refreshed,
            report.duplicates,
            report.removed,
            report.unchanged,
            report.unresolved.len(),
            report.failed
        );
        Ok(report)
    }

    /// Process one candidate.
    async fn sync_item(
        &self,
        writer: &dyn ContentWriter,
        item: &RemoteListItem,
        report: &mut SyncReport,
        cursor: Option<&mut ShowSyncCursor>,
        force: bool,
    ) -> ItemOutcome {
        let media = media_kind(report.kind);
        let Some(id) = self.resolver.resolve(&item.ids, media).await else {
            warn!(
                "Could not resolve {} (remote id {}), skipping",
                item.title,
                item.remote_key()
            );
            report.unresolved.push(item.title.clone());
            report.count("unresolved");
            return ItemOutcome::Skipped;
        };

        if self.ledger.is_marked_deleted(id, media) {
            debug!("Skipping removed {} {}", media, id);
            report.removed += 1;
            report.count("removed");
            return ItemOutcome::Skipped;
        }

        let key = item.remote_key();
        let local = self.is_local(media, id).await;
        if let Some(cursor) = cursor.as_deref() {
            if local && !force && cursor.is_current(key, item.updated_at) {
                report.unchanged += 1;
                report.count("unchanged");
                return ItemOutcome::Skipped;
            }
        } else if local && !force && !report.full_list {
            // Already rendered, possibly by a pass that failed before recording it.
            report.duplicates += 1;
            report.count("duplicate");
            return ItemOutcome::Record(id);
        }

        let written = match report.kind {
            ListKind::Movies => writer.write_movie(id, force).await.map(|m| m.title),
            ListKind::Shows => writer.write_show(id, false, force).await.map(|s| s.name),
        };
        if written.is_ok() {
            if let Some(cursor) = cursor {
                cursor.record(key, item.updated_at);
            }
        }
        match written {
            Ok(name) if local => {
                debug!("Refreshed {} {} ({})", media, name, id);
                match report.kind {
                    ListKind::Movies => {
                        report.duplicates += 1;
                        report.count("duplicate");
                    }
                    ListKind::Shows => {
                        report.refreshed += 1;
                        report.count("refreshed");
                    }
                }
                ItemOutcome::Record(id)
            }
            Ok(name) => {
                debug!("Added {} {} ({})", media, name, id);
                report.added.push(id);
                report.count("added");
                ItemOutcome::Record(id)
            }
            Err(e) => {
                warn!("Failed to sync {} {} ({}): {}", media, item.title, id, e);
                report.failed += 1;
                report.count("failed");
                ItemOutcome::Failed
            }
        }
    }

    async fn is_local(&self, media: MediaKind, id: u32) -> bool {
        match media {
            MediaKind::Movie => self.index.is_duplicate_movie(id).await,
            _ => self.index.is_duplicate_show(id).await,
        }
    }

    fn bootstrap_key(kind: ListKind) -> String {
        format!("{}{}", keys::BOOTSTRAPPED_PREFIX, kind)
    }

    /// Whether a pass for this list kind has completed before.
    pub fn is_bootstrapped(&self, kind: ListKind) -> bool {
        match self.cache.get_json::<bool>(&Self::bootstrap_key(kind)) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!("Could not read bootstrap flag for {}: {}", kind, e);
                false
            }
        }
    }

    fn mark_bootstrapped(&self, kind: ListKind) -> Result<(), LibraryError> {
        self.cache
            .set_json(&Self::bootstrap_key(kind), &true, None)?;
        Ok(())
    }

    async fn request_rescan(&self, report: &SyncReport) -> bool {
        if report.added.is_empty() {
            return false;
        }

        let approved = match self.update_policy {
            LibraryUpdatePolicy::Never => false,
            LibraryUpdatePolicy::Always => true,
            LibraryUpdatePolicy::Ask => {
                let message = format!(
                    "Update the library with {} new {} from {}?",
                    report.added.len(),
                    report.kind,
                    report.list
                );
                self.host.confirm(&message).await
            }
        };

        if approved {
            self.refresh.request(RefreshKind::HostLibrary);
        }
        approved
    }
}

/// Diffed entries plus entries that changed remotely since the last pass,
/// in list order.
fn with_stale(
    diffed: &[RemoteListItem],
    current: &[RemoteListItem],
    cursor: &ShowSyncCursor,
) -> Vec<RemoteListItem> {
    let diffed: HashSet<u64> = diffed.iter().map(|i| i.remote_key()).collect();
    let mut seen = HashSet::new();
    current
        .iter()
        .filter(|i| diffed.contains(&i.remote_key()) || cursor.is_stale(i.remote_key(), i.updated_at))
        .filter(|i| seen.insert(i.remote_key()))
        .cloned()
        .collect()
}

fn media_kind(kind: ListKind) -> MediaKind {
    match kind {
        ListKind::Movies => MediaKind::Movie,
        ListKind::Shows => MediaKind::Show,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteCache;
    use crate::lists::SnapshotListProvider;
    use crate::metadata::{Movie, Show};
    use crate::refresh::RefreshPhase;
    use crate::render::{RenderConfig, StrmRenderer};
    use crate::testing::{
        fixtures, MockDuplicateIndex, MockHost, MockLedger, MockListSource, MockMetadataProvider,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writer that records calls and registers rendered items in the index.
    struct FakeWriter {
        index: Arc<MockDuplicateIndex>,
        failing: HashSet<u32>,
        written: Mutex<Vec<u32>>,
    }

    impl FakeWriter {
        fn written(&self) -> Vec<u32> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentWriter for FakeWriter {
        async fn write_movie(&self, id: u32, _force: bool) -> Result<Movie, LibraryError> {
            if self.failing.contains(&id) {
                return Err(LibraryError::NotFound(format!("movie {}", id)));
            }
            self.written.lock().unwrap().push(id);
            self.index.add_movie(id);
            Ok(fixtures::movie(id, "Movie", 2020))
        }

        async fn write_show(&self, id: u32, _adding: bool, _force: bool) -> Result<Show, LibraryError> {
            self.written.lock().unwrap().push(id);
            self.index.add_episodes(id, &[(1, 1)]);
            Ok(fixtures::show(id, "Show", &[(1, 1)]))
        }
    }

    struct Harness {
        _dir: TempDir,
        driver: SyncDriver,
        writer: FakeWriter,
        source: Arc<MockListSource>,
        ledger: Arc<MockLedger>,
        index: Arc<MockDuplicateIndex>,
        host: Arc<MockHost>,
        refresh: RefreshState,
    }

    fn harness(policy: LibraryUpdatePolicy, bootstrap_policy: BootstrapPolicy) -> Harness {
        let dir = TempDir::new().unwrap();
        let cache: Arc<dyn KeyValueCache> = Arc::new(SqliteCache::in_memory().unwrap());
        let source = Arc::new(MockListSource::new());
        let ledger = Arc::new(MockLedger::new());
        let index = Arc::new(MockDuplicateIndex::new());
        let host = Arc::new(MockHost::new());
        let collaborators = Collaborators {
            ledger: ledger.clone(),
            index: index.clone(),
            metadata: Arc::new(MockMetadataProvider::new()),
            lists: Arc::new(SnapshotListProvider::new(source.clone(), cache.clone())),
            renderer: Arc::new(StrmRenderer::new(RenderConfig {
                library_path: dir.path().to_path_buf(),
                plugin_id: "plugin.video.vlibrary".to_string(),
                localized_titles: false,
                write_nfo_movies: false,
                write_nfo_shows: false,
            })),
            host: host.clone(),
            cache,
        };
        let refresh = RefreshState::new();
        let config = SyncConfig {
            bootstrap_policy,
            ..Default::default()
        };
        let driver = SyncDriver::new(config, policy, &collaborators, refresh.clone());
        let writer = FakeWriter {
            index: index.clone(),
            failing: HashSet::new(),
            written: Mutex::new(Vec::new()),
        };
        Harness {
            _dir: dir,
            driver,
            writer,
            source,
            ledger,
            index,
            host,
            refresh,
        }
    }

    fn default_harness() -> Harness {
        harness(LibraryUpdatePolicy::Always, BootstrapPolicy::FullList)
    }

    async fn set_movies(h: &Harness, ids: &[u32]) {
        let items = ids
            .iter()
            .map(|id| fixtures::list_item(*id, &format!("Movie {}", id)))
            .collect();
        h.source
            .set_list(ListKind::Movies, ListId::Watchlist, items)
            .await;
    }

    async fn sync(h: &Harness, kind: ListKind) -> SyncReport {
        h.driver
            .sync(&h.writer, kind, &ListId::Watchlist, SyncOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_pass_adds_full_list() {
        let h = default_harness();
        set_movies(&h, &[1, 2, 3]).await;

        let report = sync(&h, ListKind::Movies).await;
        assert!(report.full_list);
        assert_eq!(report.added, vec![1, 2, 3]);
        assert!(report.rescan_requested);
        assert_eq!(h.refresh.phase(RefreshKind::HostLibrary), RefreshPhase::Pending);
        assert!(h.driver.is_bootstrapped(ListKind::Movies));
        assert!(!h.driver.is_bootstrapped(ListKind::Shows));

        assert_eq!(h.ledger.batch_count(), 1);
        for id in [1, 2, 3] {
            assert!(!h.ledger.get(id, MediaKind::Movie).unwrap().is_deleted());
        }
    }

    #[tokio::test]
    async fn test_later_pass_only_touches_new_entries() {
        let h = default_harness();
        set_movies(&h, &[1, 2]).await;
        sync(&h, ListKind::Movies).await;
        h.refresh.try_start(RefreshKind::HostLibrary).unwrap();
        h.refresh.finish(RefreshKind::HostLibrary);

        let unchanged = sync(&h, ListKind::Movies).await;
        assert!(!unchanged.full_list);
        assert_eq!(unchanged.candidates, 0);
        assert!(!unchanged.rescan_requested);
        assert_eq!(h.refresh.phase(RefreshKind::HostLibrary), RefreshPhase::Idle);

        set_movies(&h, &[1, 2, 3]).await;
        let report = sync(&h, ListKind::Movies).await;
        assert_eq!(report.candidates, 1);
        assert_eq!(report.added, vec![3]);
        assert_eq!(h.writer.written(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_removed_entries_are_not_rendered() {
        let h = default_harness();
        h.ledger.save(&LibraryItem::movie(2).deleted()).unwrap();
        set_movies(&h, &[1, 2]).await;

        let report = sync(&h, ListKind::Movies).await;
        assert_eq!(report.added, vec![1]);
        assert_eq!(report.removed, 1);
        assert!(h.ledger.get(2, MediaKind::Movie).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn test_item_failures_do_not_abort_the_pass() {
        let mut h = default_harness();
        h.writer.failing.insert(2);
        let mut items = vec![
            fixtures::list_item(1, "One"),
            fixtures::list_item(2, "Two"),
            fixtures::list_item(3, "Three"),
        ];
        items[2].ids.tmdb = None;
        h.source
            .set_list(ListKind::Movies, ListId::Watchlist, items)
            .await;

        let report = sync(&h, ListKind::Movies).await;
        assert_eq!(report.added, vec![1]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.unresolved, vec!["Three".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_the_pass() {
        let h = default_harness();
        h.source.set_failing(true).await;

        let result = h
            .driver
            .sync(&h.writer, ListKind::Movies, &ListId::Watchlist, SyncOptions::default())
            .await;
        assert!(matches!(result, Err(LibraryError::List(_))));
        assert!(!h.driver.is_bootstrapped(ListKind::Movies));
    }

    #[tokio::test]
    async fn test_batch_failure_is_returned() {
        let h = default_harness();
        set_movies(&h, &[1]).await;
        h.ledger.set_fail_writes(true);

        let result = h
            .driver
            .sync(&h.writer, ListKind::Movies, &ListId::Watchlist, SyncOptions::default())
            .await;
        assert!(matches!(result, Err(LibraryError::Storage(_))));
        assert!(h.ledger.is_empty());
        assert!(!h.driver.is_bootstrapped(ListKind::Movies));
    }

    #[tokio::test]
    async fn test_batch_failure_is_retried_next_pass() {
        let h = default_harness();
        set_movies(&h, &[1]).await;
        sync(&h, ListKind::Movies).await;

        set_movies(&h, &[1, 2]).await;
        h.ledger.set_fail_writes(true);
        let result = h
            .driver
            .sync(&h.writer, ListKind::Movies, &ListId::Watchlist, SyncOptions::default())
            .await;
        assert!(result.is_err());
        h.ledger.set_fail_writes(false);

        // Movie 2 was rendered before the batch failed, so it is local now.
        let retry = sync(&h, ListKind::Movies).await;
        assert_eq!(retry.candidates, 1);
        assert_eq!(retry.duplicates, 1);
        assert!(!h.ledger.get(2, MediaKind::Movie).unwrap().is_deleted());

        let quiet = sync(&h, ListKind::Movies).await;
        assert_eq!(quiet.candidates, 0);
    }

    #[tokio::test]
    async fn test_failed_entries_come_back_next_pass() {
        let mut h = default_harness();
        h.writer.failing.insert(2);
        set_movies(&h, &[1, 2]).await;

        let first = sync(&h, ListKind::Movies).await;
        assert_eq!(first.added, vec![1]);
        assert_eq!(first.failed, 1);
        assert!(h.ledger.get(2, MediaKind::Movie).is_err());

        h.writer.failing.remove(&2);
        let second = sync(&h, ListKind::Movies).await;
        assert!(!second.full_list);
        assert_eq!(second.candidates, 1);
        assert_eq!(second.added, vec![2]);
        assert!(!h.ledger.get(2, MediaKind::Movie).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn test_ask_policy_declined() {
        let h = harness(LibraryUpdatePolicy::Ask, BootstrapPolicy::FullList);
        h.host.set_confirm_answer(false).await;
        set_movies(&h, &[1]).await;

        let report = sync(&h, ListKind::Movies).await;
        assert_eq!(report.added, vec![1]);
        assert!(!report.rescan_requested);
        assert_eq!(h.host.confirmations().await.len(), 1);
        assert_eq!(h.refresh.phase(RefreshKind::HostLibrary), RefreshPhase::Idle);
    }

    #[tokio::test]
    async fn test_never_policy_skips_rescan() {
        let h = harness(LibraryUpdatePolicy::Never, BootstrapPolicy::FullList);
        set_movies(&h, &[1]).await;

        let report = sync(&h, ListKind::Movies).await;
        assert!(!report.rescan_requested);
        assert!(h.host.confirmations().await.is_empty());
    }

    #[tokio::test]
    async fn test_diff_with_backfill_skips_local_entries() {
        let h = harness(LibraryUpdatePolicy::Always, BootstrapPolicy::DiffWithBackfill);
        h.index.add_movie(1);
        // Seed a snapshot containing every entry so only the backfill clause applies.
        set_movies(&h, &[1, 2]).await;
        let seeded = h
            .driver
            .lists
            .current_list(ListKind::Movies, &ListId::Watchlist)
            .await
            .unwrap();
        h.driver
            .lists
            .commit_snapshot(ListKind::Movies, &ListId::Watchlist, &seeded)
            .await
            .unwrap();

        let report = sync(&h, ListKind::Movies).await;
        assert!(!report.full_list);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.added, vec![2]);
    }

    #[tokio::test]
    async fn test_show_cursor_rerenders_changed_entries() {
        let h = default_harness();
        let mut show = fixtures::list_item(7, "Dark");
        show.updated_at = fixtures::updated_on(1);
        h.source
            .set_list(ListKind::Shows, ListId::Watchlist, vec![show.clone()])
            .await;

        let first = sync(&h, ListKind::Shows).await;
        assert_eq!(first.added, vec![7]);

        let quiet = sync(&h, ListKind::Shows).await;
        assert_eq!(quiet.candidates, 0);

        show.updated_at = fixtures::updated_on(2);
        h.source
            .set_list(ListKind::Shows, ListId::Watchlist, vec![show])
            .await;
        let changed = sync(&h, ListKind::Shows).await;
        assert_eq!(changed.candidates, 1);
        assert_eq!(changed.refreshed, 1);
        assert!(changed.added.is_empty());
        assert!(!changed.rescan_requested);
        assert_eq!(h.writer.written(), vec![7, 7]);
    }

    #[tokio::test]
    async fn test_force_reprocesses_everything() {
        let h = default_harness();
        set_movies(&h, &[1, 2]).await;
        sync(&h, ListKind::Movies).await;

        let report = h
            .driver
            .sync(
                &h.writer,
                ListKind::Movies,
                &ListId::Watchlist,
                SyncOptions {
                    force: true,
                    request_rescan: false,
                },
            )
            .await
            .unwrap();
        assert!(report.full_list);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.duplicates, 2);
        assert_eq!(h.writer.written(), vec![1, 2, 1, 2]);
    }
}
