//! Lock-guarded wrappers for sharing across threads
//!
//! The allocator sits behind a single mutex since allocate/free are rare next
//! to lookups. Each store sits behind its own read-write lock so lookups run
//! concurrently. The two are not synchronized with each other: a store can
//! still answer a lookup for a handle another thread has just freed. Callers
//! that need a strict ordering must serialize free with their store accesses.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::allocator::Allocator;
use crate::error::AllocError;
use crate::handle::Handle;
use crate::store::IndexedStore;

/// Allocator shared between threads
#[derive(Debug, Clone, Default)]
pub struct SharedAllocator {
    inner: Arc<Mutex<Allocator>>,
}

impl SharedAllocator {
    /// Wrap an allocator for sharing
    pub fn new(allocator: Allocator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    /// Allocate a handle
    pub fn allocate(&self) -> Result<Handle, AllocError> {
        self.inner.lock().allocate()
    }

    /// Free a handle
    pub fn free(&self, handle: Handle) -> bool {
        self.inner.lock().free(handle)
    }

    /// Check whether a handle is live
    pub fn is_live(&self, handle: Handle) -> bool {
        self.inner.lock().is_live(handle)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no handle is live
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Total slots ever created
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Run `f` with exclusive access to the allocator
    pub fn with<R>(&self, f: impl FnOnce(&mut Allocator) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

/// Store shared between threads
#[derive(Debug)]
pub struct SharedStore<T> {
    inner: Arc<RwLock<IndexedStore<T>>>,
}

impl<T> SharedStore<T> {
    /// Wrap a store for sharing
    pub fn new(store: IndexedStore<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Write a value (exclusive)
    pub fn set(&self, handle: Handle, value: T) -> Option<T> {
        self.inner.write().set(handle, value)
    }

    /// Remove a value (exclusive)
    pub fn remove(&self, handle: Handle) -> Option<T> {
        self.inner.write().remove(handle)
    }

    /// Check for a value (shared)
    pub fn contains(&self, handle: Handle) -> bool {
        self.inner.read().contains(handle)
    }

    /// Read access to the whole store
    pub fn read(&self) -> RwLockReadGuard<'_, IndexedStore<T>> {
        self.inner.read()
    }

    /// Write access to the whole store
    pub fn write(&self) -> RwLockWriteGuard<'_, IndexedStore<T>> {
        self.inner.write()
    }
}

impl<T: Clone> SharedStore<T> {
    /// Clone out the value stored for `handle` (shared)
    pub fn get_cloned(&self, handle: Handle) -> Option<T> {
        self.inner.read().get(handle).cloned()
    }
}

impl<T> Clone for SharedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedStore<T> {
    fn default() -> Self {
        Self::new(IndexedStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let allocator = SharedAllocator::default();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || {
                    (0..250)
                        .map(|_| allocator.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut slots: Vec<_> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .map(|h| h.slot())
            .collect();
        slots.sort_unstable();
        slots.dedup();

        assert_eq!(slots.len(), 1000);
        assert_eq!(allocator.len(), 1000);
    }

    #[test]
    fn test_concurrent_readers() {
        let allocator = SharedAllocator::default();
        let store = SharedStore::default();
        let handles: Vec<_> = (0..64).map(|_| allocator.allocate().unwrap()).collect();
        for (i, &handle) in handles.iter().enumerate() {
            store.set(handle, i);
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let handles = handles.clone();
                thread::spawn(move || {
                    handles
                        .iter()
                        .filter_map(|&h| store.get_cloned(h))
                        .sum::<usize>()
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), (0..64).sum::<usize>());
        }
    }

    #[test]
    fn test_freed_handle_goes_stale_in_shared_store() {
        let allocator = SharedAllocator::new(Allocator::with_limit(1));
        let store = SharedStore::default();

        let old = allocator.allocate().unwrap();
        store.set(old, "old");
        assert!(allocator.free(old));

        let new = allocator.allocate().unwrap();
        assert_eq!(store.get_cloned(new), None);
        store.set(new, "new");

        assert_eq!(store.get_cloned(old), None);
        assert_eq!(store.remove(new), Some("new"));
        assert!(!store.contains(new));
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_with_exposes_allocator() {
        let allocator = SharedAllocator::default();
        allocator.with(|a| a.reserve(8));
        assert_eq!(allocator.capacity(), 8);
        assert!(allocator.is_empty());
    }
}
