//! Host call surface
//!
//! Hosts that cannot own Rust values directly (scripting runtimes, foreign
//! function boundaries) hold opaque [`AllocatorId`]s and [`StoreId`]s instead.
//! Each id must be disposed exactly once. Any use after disposal, including a
//! second dispose, fails with [`BoundaryError::Disposed`] instead of touching
//! freed storage.

use std::ops::{Deref, DerefMut};

use slotmap::{new_key_type, SlotMap};

use crate::allocator::Allocator;
use crate::config::{AllocatorConfig, StoreConfig};
use crate::error::{BoundaryError, ObjectKind};
use crate::handle::Handle;
use crate::store::IndexedStore;

new_key_type! {
    /// Opaque id of an allocator owned by [`HostBindings`]
    pub struct AllocatorId;

    /// Opaque id of a store owned by [`HostBindings`]
    pub struct StoreId;
}

/// Payload type for hosts with loosely typed values
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// No value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Text(String),
    /// Ordered list of values
    List(Vec<HostValue>),
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(values: Vec<HostValue>) -> Self {
        Self::List(values)
    }
}

/// Owner of every allocator and store a host has created
#[derive(Debug)]
pub struct HostBindings<T = HostValue> {
    allocators: SlotMap<AllocatorId, Allocator>,
    stores: SlotMap<StoreId, IndexedStore<T>>,
    allocator_config: AllocatorConfig,
    store_config: StoreConfig,
}

impl<T> HostBindings<T> {
    /// Create bindings with default configuration
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default(), StoreConfig::default())
    }

    /// Create bindings whose new allocators and stores start from this configuration
    pub fn with_config(allocator_config: AllocatorConfig, store_config: StoreConfig) -> Self {
        Self {
            allocators: SlotMap::with_key(),
            stores: SlotMap::with_key(),
            allocator_config,
            store_config,
        }
    }

    /// Create an allocator
    ///
    /// `capacity_hint` bounds the allocator; `None` keeps the configured bound.
    pub fn new_allocator(&mut self, capacity_hint: Option<usize>) -> AllocatorId {
        let mut config = self.allocator_config.clone();
        if let Some(capacity) = capacity_hint {
            config.capacity = Some(capacity);
            config.initial_reserve = config.initial_reserve.min(capacity);
        }

        let id = self.allocators.insert(Allocator::from_config(&config));
        log::debug!("Created allocator {id:?} (capacity {:?})", config.capacity);
        id
    }

    /// Allocate a handle from `allocator`
    pub fn allocate(&mut self, allocator: AllocatorId) -> Result<Handle, BoundaryError> {
        Ok(self.allocator_mut(allocator)?.allocate()?)
    }

    /// Free a handle in `allocator`
    pub fn free(&mut self, allocator: AllocatorId, handle: Handle) -> Result<bool, BoundaryError> {
        Ok(self.allocator_mut(allocator)?.free(handle))
    }

    /// Check whether a handle is live in `allocator`
    pub fn is_live(&self, allocator: AllocatorId, handle: Handle) -> Result<bool, BoundaryError> {
        Ok(self.allocator(allocator)?.is_live(handle))
    }

    /// Create a store
    pub fn new_store(&mut self) -> StoreId {
        let id = self.stores.insert(IndexedStore::from_config(&self.store_config));
        log::debug!("Created store {id:?}");
        id
    }

    /// Write a value into `store`
    pub fn store_set(&mut self, store: StoreId, handle: Handle, value: T) -> Result<(), BoundaryError> {
        self.store_mut(store)?.set(handle, value);
        Ok(())
    }

    /// Take a value out of `store`
    pub fn store_remove(&mut self, store: StoreId, handle: Handle) -> Result<Option<T>, BoundaryError> {
        Ok(self.store_mut(store)?.remove(handle))
    }

    /// Check whether `store` holds a value for `handle`
    pub fn store_contains(&self, store: StoreId, handle: Handle) -> Result<bool, BoundaryError> {
        Ok(self.store(store)?.contains(handle))
    }

    /// Release an allocator
    pub fn dispose_allocator(&mut self, allocator: AllocatorId) -> Result<(), BoundaryError> {
        self.allocators
            .remove(allocator)
            .ok_or(BoundaryError::Disposed(ObjectKind::Allocator))?;
        log::debug!("Disposed allocator {allocator:?}");
        Ok(())
    }

    /// Release a store and every value it holds
    pub fn dispose_store(&mut self, store: StoreId) -> Result<(), BoundaryError> {
        self.stores
            .remove(store)
            .ok_or(BoundaryError::Disposed(ObjectKind::Store))?;
        log::debug!("Disposed store {store:?}");
        Ok(())
    }

    /// Number of allocators not yet disposed
    pub fn allocator_count(&self) -> usize {
        self.allocators.len()
    }

    /// Number of stores not yet disposed
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Borrow an allocator
    pub fn allocator(&self, id: AllocatorId) -> Result<&Allocator, BoundaryError> {
        self.allocators
            .get(id)
            .ok_or(BoundaryError::Disposed(ObjectKind::Allocator))
    }

    /// Borrow an allocator mutably
    pub fn allocator_mut(&mut self, id: AllocatorId) -> Result<&mut Allocator, BoundaryError> {
        self.allocators
            .get_mut(id)
            .ok_or(BoundaryError::Disposed(ObjectKind::Allocator))
    }

    /// Borrow a store
    pub fn store(&self, id: StoreId) -> Result<&IndexedStore<T>, BoundaryError> {
        self.stores
            .get(id)
            .ok_or(BoundaryError::Disposed(ObjectKind::Store))
    }

    /// Borrow a store mutably
    pub fn store_mut(&mut self, id: StoreId) -> Result<&mut IndexedStore<T>, BoundaryError> {
        self.stores
            .get_mut(id)
            .ok_or(BoundaryError::Disposed(ObjectKind::Store))
    }

    /// Create an allocator that is disposed when the guard drops
    pub fn scoped_allocator(&mut self, capacity_hint: Option<usize>) -> ScopedAllocator<'_, T> {
        let id = self.new_allocator(capacity_hint);
        ScopedAllocator { bindings: self, id }
    }

    /// Create a store that is disposed when the guard drops
    pub fn scoped_store(&mut self) -> ScopedStore<'_, T> {
        let id = self.new_store();
        ScopedStore { bindings: self, id }
    }
}

impl<T: Clone> HostBindings<T> {
    /// Copy a value out of `store`
    pub fn store_get(&self, store: StoreId, handle: Handle) -> Result<Option<T>, BoundaryError> {
        Ok(self.store(store)?.get(handle).cloned())
    }
}

impl<T> Default for HostBindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocator guard that disposes its allocator on drop
///
/// Derefs to the owning [`HostBindings`] so other objects can still be used
/// while the guard is alive.
pub struct ScopedAllocator<'a, T = HostValue> {
    bindings: &'a mut HostBindings<T>,
    id: AllocatorId,
}

impl<T> ScopedAllocator<'_, T> {
    /// The guarded allocator's id
    pub fn id(&self) -> AllocatorId {
        self.id
    }
}

impl<T> Deref for ScopedAllocator<'_, T> {
    type Target = HostBindings<T>;

    fn deref(&self) -> &Self::Target {
        self.bindings
    }
}

impl<T> DerefMut for ScopedAllocator<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bindings
    }
}

impl<T> Drop for ScopedAllocator<'_, T> {
    fn drop(&mut self) {
        if self.bindings.dispose_allocator(self.id).is_err() {
            log::warn!("Scoped allocator {:?} was disposed early", self.id);
        }
    }
}

/// Store guard that disposes its store on drop
pub struct ScopedStore<'a, T = HostValue> {
    bindings: &'a mut HostBindings<T>,
    id: StoreId,
}

impl<T> ScopedStore<'_, T> {
    /// The guarded store's id
    pub fn id(&self) -> StoreId {
        self.id
    }
}

impl<T> Deref for ScopedStore<'_, T> {
    type Target = HostBindings<T>;

    fn deref(&self) -> &Self::Target {
        self.bindings
    }
}

impl<T> DerefMut for ScopedStore<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bindings
    }
}

impl<T> Drop for ScopedStore<'_, T> {
    fn drop(&mut self) {
        if self.bindings.dispose_store(self.id).is_err() {
            log::warn!("Scoped store {:?} was disposed early", self.id);
        }
    }
}
