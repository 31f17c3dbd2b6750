//! Mock state ledger for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::ledger::{LedgerError, LedgerFilter, LibraryItem, MediaKind, StateLedger};

/// In-memory StateLedger with failure injection.
///
/// While writes are failing, `save` and `save_batch` return a database
/// error and leave the records untouched.
#[derive(Debug, Default)]
pub struct MockLedger {
    items: Mutex<BTreeMap<(u32, MediaKind), LibraryItem>>,
    fail_writes: AtomicBool,
    batches: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, BTreeMap<(u32, MediaKind), LibraryItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful batch saves.
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl StateLedger for MockLedger {
    fn save(&self, item: &LibraryItem) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.items()
            .insert((item.external_id, item.media_kind), item.clone());
        Ok(())
    }

    fn save_batch(&self, items: &[LibraryItem]) -> Result<(), LedgerError> {
        self.check_writable()?;
        let mut stored = self.items();
        for item in items {
            stored.insert((item.external_id, item.media_kind), item.clone());
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, id: u32, kind: MediaKind) -> Result<LibraryItem, LedgerError> {
        self.items()
            .get(&(id, kind))
            .cloned()
            .ok_or(LedgerError::NotFound { id, kind })
    }

    fn find(&self, filter: &LedgerFilter) -> Result<Vec<LibraryItem>, LedgerError> {
        Ok(self
            .items()
            .values()
            .filter(|i| filter.media_kind.map_or(true, |k| i.media_kind == k))
            .filter(|i| filter.state.map_or(true, |s| i.state == s))
            .filter(|i| filter.show_id.map_or(true, |s| i.show_id == s))
            .cloned()
            .collect())
    }

    fn delete(&self, id: u32, kind: MediaKind) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.items()
            .remove(&(id, kind))
            .map(|_| ())
            .ok_or(LedgerError::NotFound { id, kind })
    }
}
