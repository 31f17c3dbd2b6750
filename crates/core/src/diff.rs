//! List diff engine.
//!
//! Computes which entries of a remote list need processing, given the
//! previous and current snapshots.

use std::collections::HashSet;

use crate::lists::RemoteListItem;

/// What the diff needs to know about a list entry.
pub trait ListEntry {
    /// Key unique within one list.
    fn remote_key(&self) -> u64;

    /// Canonical id, when the entry carries one.
    fn external_id(&self) -> Option<u32>;
}

impl ListEntry for RemoteListItem {
    fn remote_key(&self) -> u64 {
        self.ids.trakt
    }

    fn external_id(&self) -> Option<u32> {
        self.ids.tmdb
    }
}

/// Entries of `current` that need processing.
///
/// Always includes entries absent from `previous`. Until the list kind is
/// `bootstrapped`, also includes entries not already present locally, so a
/// first pass against an empty snapshot still catches up. The result is
/// free of duplicate remote keys and keeps the order of `current`.
pub fn diff_list<T, F>(previous: &[T], current: &[T], bootstrapped: bool, is_local: F) -> Vec<T>
where
    T: ListEntry + Clone,
    F: Fn(u32) -> bool,
{
    let previous_keys: HashSet<u64> = previous.iter().map(|e| e.remote_key()).collect();
    let mut seen = HashSet::new();

    current
        .iter()
        .filter(|entry| {
            let is_new = !previous_keys.contains(&entry.remote_key());
            let needs_backfill = !bootstrapped && !entry.external_id().is_some_and(&is_local);
            is_new || needs_backfill
        })
        .filter(|entry| seen.insert(entry.remote_key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(u64, Option<u32>);

    impl ListEntry for Entry {
        fn remote_key(&self) -> u64 {
            self.0
        }

        fn external_id(&self) -> Option<u32> {
            self.1
        }
    }

    fn keys(entries: &[Entry]) -> Vec<u64> {
        entries.iter().map(|e| e.0).collect()
    }

    #[test]
    fn test_only_new_entries_after_bootstrap() {
        let previous = vec![Entry(1, Some(10)), Entry(2, Some(20))];
        let current = vec![Entry(1, Some(10)), Entry(2, Some(20)), Entry(3, Some(30))];

        let result = diff_list(&previous, &current, true, |_| false);
        assert_eq!(keys(&result), vec![3]);
    }

    #[test]
    fn test_unchanged_list_yields_nothing() {
        let list = vec![Entry(1, Some(10)), Entry(2, None)];
        assert!(diff_list(&list, &list, true, |_| false).is_empty());
    }

    #[test]
    fn test_bootstrap_backfills_missing_local_items() {
        let previous = vec![Entry(1, Some(10)), Entry(2, Some(20))];
        let current = vec![Entry(1, Some(10)), Entry(2, Some(20)), Entry(4, None)];

        // 10 is local already, 20 is not.
        let result = diff_list(&previous, &current, false, |id| id == 10);
        assert_eq!(keys(&result), vec![2, 4]);
    }

    #[test]
    fn test_empty_previous_is_full_list() {
        let current = vec![Entry(5, Some(50)), Entry(6, Some(60))];
        let result = diff_list(&[], &current, true, |_| true);
        assert_eq!(result, current);
    }

    #[test]
    fn test_first_pass_takes_every_entry_in_order() {
        let current = vec![Entry(9, Some(90)), Entry(3, Some(30)), Entry(5, Some(50))];
        let result = diff_list(&[], &current, false, |_| false);
        assert_eq!(result, current);
    }

    #[test]
    fn test_new_entry_already_local_is_included() {
        let previous = vec![Entry(1, Some(10))];
        let current = vec![Entry(1, Some(10)), Entry(2, Some(20))];

        // Entry 2 is local, but being new is enough.
        let result = diff_list(&previous, &current, false, |_| true);
        assert_eq!(keys(&result), vec![2]);
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let current = vec![Entry(7, Some(70)), Entry(7, Some(70)), Entry(8, None)];
        let result = diff_list(&[], &current, true, |_| false);
        assert_eq!(keys(&result), vec![7, 8]);
    }

    #[test]
    fn test_removed_entries_are_ignored() {
        let previous = vec![Entry(1, Some(10)), Entry(2, Some(20))];
        let current = vec![Entry(2, Some(20))];
        assert!(diff_list(&previous, &current, true, |_| false).is_empty());
    }
}
