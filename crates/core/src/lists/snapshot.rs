use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ListError, ListId, ListKind, ListProvider, ListSource, RemoteListItem};
use crate::cache::{keys, CacheExt, KeyValueCache};

/// [`ListProvider`] that keeps the previous snapshot in the cache.
pub struct SnapshotListProvider {
    source: Arc<dyn ListSource>,
    cache: Arc<dyn KeyValueCache>,
}

impl SnapshotListProvider {
    pub fn new(source: Arc<dyn ListSource>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self { source, cache }
    }

    fn snapshot_key(kind: ListKind, list: &ListId) -> String {
        format!("{}{}.{}", keys::LIST_SNAPSHOT_PREFIX, kind, list)
    }
}

#[async_trait]
impl ListProvider for SnapshotListProvider {
    async fn current_list(
        &self,
        kind: ListKind,
        list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError> {
        let items = self.source.fetch(kind, list).await?;
        debug!("Fetched {} {} entries from list {}", items.len(), kind, list);
        Ok(items)
    }

    async fn previous_list(
        &self,
        kind: ListKind,
        list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError> {
        let items: Option<Vec<RemoteListItem>> = self
            .cache
            .get_json(&Self::snapshot_key(kind, list))
            .map_err(|e| ListError::Storage(e.to_string()))?;
        Ok(items.unwrap_or_default())
    }

    async fn commit_snapshot(
        &self,
        kind: ListKind,
        list: &ListId,
        items: &[RemoteListItem],
    ) -> Result<(), ListError> {
        self.cache
            .set_json(&Self::snapshot_key(kind, list), &items, None)
            .map_err(|e| ListError::Storage(e.to_string()))?;
        debug!("Committed {} {} entries for list {}", items.len(), kind, list);
        Ok(())
    }
}
