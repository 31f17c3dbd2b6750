//! Mock list source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::lists::{ListError, ListId, ListKind, ListSource, RemoteListItem};

/// Mock implementation of the ListSource trait.
///
/// Wrap it in a [`crate::lists::SnapshotListProvider`] to get snapshot
/// semantics on top of the configured lists.
#[derive(Debug, Default)]
pub struct MockListSource {
    lists: Arc<RwLock<HashMap<(ListKind, ListId), Vec<RemoteListItem>>>>,
    fetches: Arc<RwLock<Vec<(ListKind, ListId)>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockListSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_list(&self, kind: ListKind, list: ListId, items: Vec<RemoteListItem>) {
        self.lists.write().await.insert((kind, list), items);
    }

    /// Fail every fetch until reset.
    pub async fn set_failing(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl ListSource for MockListSource {
    async fn fetch(&self, kind: ListKind, list: &ListId) -> Result<Vec<RemoteListItem>, ListError> {
        self.fetches.write().await.push((kind, list.clone()));
        if *self.fail.read().await {
            return Err(ListError::ApiError {
                status: 503,
                message: "mock failure".to_string(),
            });
        }
        Ok(self
            .lists
            .read()
            .await
            .get(&(kind, list.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
