//! Persistent state ledger.
//!
//! One record per `(external_id, media_kind)` tracking whether the item is
//! Active in the library or was Deleted by the user. Deleted records block
//! background re-adds until the maintenance sweep clears them.

mod sqlite;
mod types;

pub use sqlite::SqliteLedger;
pub use types::*;

use tracing::debug;

/// Storage for ledger records.
pub trait StateLedger: Send + Sync {
    /// Insert or update a single record.
    fn save(&self, item: &LibraryItem) -> Result<(), LedgerError>;

    /// Insert or update several records atomically.
    ///
    /// Either every record is persisted or none is.
    fn save_batch(&self, items: &[LibraryItem]) -> Result<(), LedgerError>;

    /// Fetch a single record.
    fn get(&self, id: u32, kind: MediaKind) -> Result<LibraryItem, LedgerError>;

    /// List records matching a filter.
    fn find(&self, filter: &LedgerFilter) -> Result<Vec<LibraryItem>, LedgerError>;

    /// Remove a record entirely.
    fn delete(&self, id: u32, kind: MediaKind) -> Result<(), LedgerError>;

    /// Change the state of an existing record.
    fn mark_state(
        &self,
        id: u32,
        kind: MediaKind,
        state: ItemState,
    ) -> Result<LibraryItem, LedgerError> {
        let item = self.get(id, kind)?.with_state(state);
        self.save(&item)?;
        Ok(item)
    }

    /// Whether the item was removed by the user.
    ///
    /// Missing records and lookup failures both read as not deleted.
    fn is_marked_deleted(&self, id: u32, kind: MediaKind) -> bool {
        match self.get(id, kind) {
            Ok(item) => item.is_deleted(),
            Err(LedgerError::NotFound { .. }) => false,
            Err(e) => {
                debug!("Ledger lookup for {} {} failed: {}", kind, id, e);
                false
            }
        }
    }
}
