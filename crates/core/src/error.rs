//! Library-level error taxonomy.
//!
//! Each collaborator has its own error type; they converge here so callers
//! can branch on [`LibraryError::is_not_found`] and friends without caring
//! which collaborator failed.

use thiserror::Error;

use crate::cache::CacheError;
use crate::host::HostError;
use crate::index::IndexError;
use crate::ledger::{LedgerError, MediaKind};
use crate::lists::ListError;
use crate::metadata::MetadataError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{kind} {id} was removed from the library")]
    VideoRemoved { kind: MediaKind, id: u32 },

    #[error("{kind} {id} is already in the library")]
    AlreadyExists { kind: MediaKind, id: u32 },

    #[error("invalid library path: {0}")]
    InvalidPath(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("metadata provider error: {0}")]
    Metadata(MetadataError),

    #[error("list provider error: {0}")]
    List(ListError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("library is shutting down")]
    ShuttingDown,

    #[error("{failed} of {total} list syncs failed: {first}")]
    Aggregate {
        failed: usize,
        total: usize,
        first: String,
    },
}

impl LibraryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound(_))
    }

    /// Transient failures that a later tick may resolve.
    pub fn is_retryable(&self) -> bool {
        match self {
            LibraryError::Metadata(e) => e.is_retryable(),
            LibraryError::List(ListError::HttpError(_)) => true,
            LibraryError::List(ListError::ApiError { status, .. }) => *status >= 500,
            LibraryError::Host(HostError::HttpError(_)) => true,
            LibraryError::Aggregate { .. } => true,
            _ => false,
        }
    }
}

impl From<LedgerError> for LibraryError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound { id, kind } => {
                LibraryError::NotFound(format!("{} {} in ledger", kind, id))
            }
            other => LibraryError::Storage(other.to_string()),
        }
    }
}

impl From<CacheError> for LibraryError {
    fn from(e: CacheError) -> Self {
        LibraryError::Storage(e.to_string())
    }
}

impl From<IndexError> for LibraryError {
    fn from(e: IndexError) -> Self {
        LibraryError::Storage(e.to_string())
    }
}

impl From<MetadataError> for LibraryError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::NotFound(what) => LibraryError::NotFound(what),
            other => LibraryError::Metadata(other),
        }
    }
}

impl From<ListError> for LibraryError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::NotFound(what) => LibraryError::NotFound(what),
            other => LibraryError::List(other),
        }
    }
}
