//! Remote list integration.
//!
//! A [`ListProvider`] serves the current and previous snapshot of a
//! watchlist, collection or user list. [`SnapshotListProvider`] builds that
//! pair on top of any [`ListSource`] by keeping the last committed
//! snapshot in the cache.

mod snapshot;
mod trakt;
mod types;

pub use snapshot::SnapshotListProvider;
pub use trakt::{TraktClient, TraktConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("List not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("List provider not configured: {0}")]
    NotConfigured(String),

    #[error("Snapshot storage failed: {0}")]
    Storage(String),
}

/// Fetches a single live list.
#[async_trait]
pub trait ListSource: Send + Sync {
    async fn fetch(&self, kind: ListKind, list: &ListId)
        -> Result<Vec<RemoteListItem>, ListError>;
}

/// Serves current and previous list snapshots.
#[async_trait]
pub trait ListProvider: Send + Sync {
    /// Fetch the live list. Does not touch the stored snapshot.
    async fn current_list(
        &self,
        kind: ListKind,
        list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError>;

    /// The snapshot stored by the last [`Self::commit_snapshot`].
    ///
    /// Empty when no snapshot was ever committed.
    async fn previous_list(
        &self,
        kind: ListKind,
        list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError>;

    /// Store the entries a completed pass handled. They become the next
    /// pass's previous snapshot.
    async fn commit_snapshot(
        &self,
        kind: ListKind,
        list: &ListId,
        items: &[RemoteListItem],
    ) -> Result<(), ListError>;
}

/// Provider used when no list service is configured.
pub struct DisabledListProvider;

#[async_trait]
impl ListProvider for DisabledListProvider {
    async fn current_list(
        &self,
        _kind: ListKind,
        _list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError> {
        Err(ListError::NotConfigured("no list service configured".to_string()))
    }

    async fn previous_list(
        &self,
        _kind: ListKind,
        _list: &ListId,
    ) -> Result<Vec<RemoteListItem>, ListError> {
        Err(ListError::NotConfigured("no list service configured".to_string()))
    }

    async fn commit_snapshot(
        &self,
        _kind: ListKind,
        _list: &ListId,
        _items: &[RemoteListItem],
    ) -> Result<(), ListError> {
        Err(ListError::NotConfigured("no list service configured".to_string()))
    }
}
