//! Remote list sync drivers.
//!
//! A sync pass fetches a list, picks the entries that need work, resolves
//! them to canonical ids and hands them to a [`ContentWriter`]. Entries the
//! user removed are never rendered again. Show entries whose remote update
//! time moved past the cursor are re-rendered even when nothing else changed.

mod cursor;
mod driver;
mod resolve;

pub use cursor::ShowSyncCursor;
pub use driver::{SyncDriver, SyncOptions, SyncReport};
pub use resolve::IdResolver;

use async_trait::async_trait;

use crate::error::LibraryError;
use crate::metadata::{Movie, Show};

/// Renders content for the sync drivers.
#[async_trait]
pub trait ContentWriter: Send + Sync {
    async fn write_movie(&self, id: u32, force: bool) -> Result<Movie, LibraryError>;

    /// `adding` re-activates the show's episodes in the ledger.
    async fn write_show(&self, id: u32, adding: bool, force: bool) -> Result<Show, LibraryError>;
}
