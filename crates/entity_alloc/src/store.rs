//! Generation-checked sparse array
//!
//! An [`IndexedStore`] keeps one optional value per slot, tagged with the
//! generation of the handle it was written under. Lookups compare that tag
//! with the handle's generation and nothing else. The store never talks to
//! the [`Allocator`]; freeing a handle makes its entries unreachable in every
//! store at once because the allocator will only ever issue a newer
//! generation for that slot.

use crate::allocator::{Allocator, MAX_SLOTS};
use crate::config::StoreConfig;
use crate::handle::{Generation, Handle, Slot};

#[derive(Debug, Clone)]
struct StoreEntry<T> {
    generation: Generation,
    value: T,
}

/// Per-handle payload table keyed by generational handles
#[derive(Debug, Clone)]
pub struct IndexedStore<T> {
    entries: Vec<Option<StoreEntry<T>>>,
    occupied: usize,
}

impl<T> IndexedStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            occupied: 0,
        }
    }

    /// Create a store with `slots` empty cells
    pub fn with_capacity(slots: usize) -> Self {
        let mut entries = Vec::with_capacity(slots);
        entries.resize_with(slots, || None);
        Self {
            entries,
            occupied: 0,
        }
    }

    /// Create a store from configuration
    ///
    /// The configuration is assumed to be validated; the slot count is clamped
    /// to what the slot width can address.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_capacity(config.initial_slots.min(MAX_SLOTS))
    }

    /// Write `value` for `handle`
    ///
    /// Overwrites whatever the slot held, whatever its generation. Returns the
    /// previous cell content only if it belonged to this same handle.
    pub fn set(&mut self, handle: Handle, value: T) -> Option<T> {
        let index = handle.index();
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }

        let previous = self.entries[index].replace(StoreEntry {
            generation: handle.generation(),
            value,
        });

        match previous {
            Some(entry) if entry.generation == handle.generation() => Some(entry.value),
            Some(_) => None,
            None => {
                self.occupied += 1;
                None
            }
        }
    }

    /// Get the value stored for `handle`, if the generations match
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.entries.get(handle.index()) {
            Some(Some(entry)) if entry.generation == handle.generation() => Some(&entry.value),
            _ => None,
        }
    }

    /// Get mutable access to the value stored for `handle`, if the generations match
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.entries.get_mut(handle.index()) {
            Some(Some(entry)) if entry.generation == handle.generation() => {
                Some(&mut entry.value)
            }
            _ => None,
        }
    }

    /// Remove and return the value stored for `handle`
    ///
    /// A stale handle never removes a newer occupant of the same slot.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let cell = self.entries.get_mut(handle.index())?;
        if cell.as_ref()?.generation != handle.generation() {
            return None;
        }

        let entry = cell.take()?;
        self.occupied -= 1;
        Some(entry.value)
    }

    /// Like [`IndexedStore::get`], but also requires `handle` to be live in `allocator`
    ///
    /// Plain `get` keeps answering for a freed handle until its slot is written
    /// again under a newer generation. Use this where a freed handle must read
    /// as gone immediately and the allocator is at hand.
    pub fn get_live(&self, handle: Handle, allocator: &Allocator) -> Option<&T> {
        if allocator.is_live(handle) {
            self.get(handle)
        } else {
            None
        }
    }

    /// Whether a value is stored for `handle`
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of occupied cells, stale or not
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Whether no cell is occupied
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Number of cells the store has grown to
    pub fn slot_len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every value, keeping the allocated cells
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|cell| *cell = None);
        self.occupied = 0;
    }

    /// Iterate over every occupied cell together with the handle it was written under
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(slot, cell)| {
            cell.as_ref().map(|entry| {
                (
                    Handle::from_raw_parts(slot as Slot, entry.generation),
                    &entry.value,
                )
            })
        })
    }

    /// Mutable variant of [`IndexedStore::iter`]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> + '_ {
        self.entries.iter_mut().enumerate().filter_map(|(slot, cell)| {
            cell.as_mut().map(|entry| {
                (
                    Handle::from_raw_parts(slot as Slot, entry.generation),
                    &mut entry.value,
                )
            })
        })
    }

    /// Drop every value whose handle is no longer live in `allocator`
    ///
    /// Lookups never consult the allocator; this sweep is how callers reclaim
    /// the memory held by stale values. Returns the number of values dropped.
    pub fn retain_live(&mut self, allocator: &Allocator) -> usize {
        let mut dropped = 0;
        for (slot, cell) in self.entries.iter_mut().enumerate() {
            let stale = cell.as_ref().is_some_and(|entry| {
                !allocator.is_live(Handle::from_raw_parts(slot as Slot, entry.generation))
            });
            if stale {
                *cell = None;
                dropped += 1;
            }
        }

        self.occupied -= dropped;
        if dropped > 0 {
            log::debug!("Dropped {dropped} stale store values");
        }
        dropped
    }
}

impl<T> Default for IndexedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_requires_matching_generation() {
        let mut store = IndexedStore::new();
        store.set(Handle::from_raw_parts(0, 0), 1);
        store.set(Handle::from_raw_parts(3, 2), 2);

        assert_eq!(store.get(Handle::from_raw_parts(0, 0)), Some(&1));
        assert_eq!(store.get(Handle::from_raw_parts(0, 1)), None);
        assert_eq!(store.get(Handle::from_raw_parts(1, 0)), None);
        assert_eq!(store.get(Handle::from_raw_parts(3, 2)), Some(&2));
        assert_eq!(store.get(Handle::from_raw_parts(3, 1)), None);
    }

    #[test]
    fn test_set_grows_lazily() {
        let mut store = IndexedStore::with_capacity(1);
        assert_eq!(store.slot_len(), 1);

        store.set(Handle::from_raw_parts(10, 0), 10);
        assert_eq!(store.slot_len(), 11);
        assert_eq!(store.get(Handle::from_raw_parts(10, 0)), Some(&10));
        assert_eq!(store.get(Handle::from_raw_parts(50, 0)), None);
    }

    #[test]
    fn test_set_overwrites_any_generation() {
        let mut store = IndexedStore::new();
        let old = Handle::from_raw_parts(2, 0);
        let new = Handle::from_raw_parts(2, 1);

        assert_eq!(store.set(old, "a"), None);
        assert_eq!(store.set(old, "b"), Some("a"));
        assert_eq!(store.set(new, "c"), None);

        assert_eq!(store.get(old), None);
        assert_eq!(store.get(new), Some(&"c"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut store = IndexedStore::new();
        let handle = Handle::from_raw_parts(1, 4);
        store.set(handle, 100);

        *store.get_mut(handle).unwrap() += 1;
        assert_eq!(store.get(handle), Some(&101));
        assert!(store.get_mut(Handle::from_raw_parts(1, 5)).is_none());
    }

    #[test]
    fn test_stale_remove_keeps_newer_value() {
        let mut store = IndexedStore::new();
        let old = Handle::from_raw_parts(0, 0);
        let new = Handle::from_raw_parts(0, 1);
        store.set(new, "current");

        assert_eq!(store.remove(old), None);
        assert_eq!(store.get(new), Some(&"current"));

        assert_eq!(store.remove(new), Some("current"));
        assert_eq!(store.remove(new), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut store: IndexedStore<i32> = IndexedStore::new();
        assert_eq!(store.remove(Handle::from_raw_parts(7, 0)), None);
        assert_eq!(store.slot_len(), 0);
    }

    #[test]
    fn test_contains() {
        let mut store = IndexedStore::new();
        let handle = Handle::from_raw_parts(5, 0);
        assert!(!store.contains(handle));

        store.set(handle, ());
        assert!(store.contains(handle));
        assert!(!store.contains(Handle::from_raw_parts(5, 1)));
    }

    #[test]
    fn test_iter_reports_stored_handles() {
        let mut store = IndexedStore::new();
        store.set(Handle::from_raw_parts(4, 1), 'x');
        store.set(Handle::from_raw_parts(1, 0), 'y');

        let items: Vec<_> = store.iter().collect();
        assert_eq!(
            items,
            vec![
                (Handle::from_raw_parts(1, 0), &'y'),
                (Handle::from_raw_parts(4, 1), &'x'),
            ]
        );

        for (_, value) in store.iter_mut() {
            *value = value.to_ascii_uppercase();
        }
        assert_eq!(store.get(Handle::from_raw_parts(4, 1)), Some(&'X'));
    }

    #[test]
    fn test_clear() {
        let mut store = IndexedStore::new();
        store.set(Handle::from_raw_parts(3, 0), 1.5);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.slot_len(), 4);
        assert_eq!(store.get(Handle::from_raw_parts(3, 0)), None);
    }

    #[test]
    fn test_get_live_rejects_freed_handle() {
        let mut allocator = Allocator::new();
        let mut store = IndexedStore::new();
        let handle = allocator.allocate().unwrap();
        store.set(handle, 5);

        assert_eq!(store.get_live(handle, &allocator), Some(&5));
        allocator.free(handle);
        assert_eq!(store.get_live(handle, &allocator), None);
        assert_eq!(store.get(handle), Some(&5));
    }

    #[test]
    fn test_retain_live() {
        let mut allocator = Allocator::new();
        let mut store = IndexedStore::new();
        let keep = allocator.allocate().unwrap();
        let gone = allocator.allocate().unwrap();
        store.set(keep, "keep");
        store.set(gone, "gone");

        allocator.free(gone);
        assert_eq!(store.len(), 2);

        assert_eq!(store.retain_live(&allocator), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(keep), Some(&"keep"));
        assert_eq!(store.get(gone), None);
    }
}
