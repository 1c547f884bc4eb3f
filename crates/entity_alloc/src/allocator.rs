//! Generational index allocator
//!
//! Hands out [`Handle`]s, reclaims them on [`Allocator::free`] and bumps the
//! slot's generation so every copy of the freed handle goes stale at once.
//! Freed slots are reused last-freed-first.

use crate::config::{AllocatorConfig, GenerationPolicy};
use crate::error::AllocError;
use crate::handle::{Generation, Handle, Slot};

/// Largest number of slots a slot number can address on this target
pub(crate) const MAX_SLOTS: usize = if usize::BITS > Slot::BITS {
    Slot::MAX as usize + 1
} else {
    usize::MAX
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocEntry {
    is_live: bool,
    generation: Generation,
}

/// Maintains per-slot generations and the free list
#[derive(Debug, Clone)]
pub struct Allocator {
    entries: Vec<AllocEntry>,
    /// Stack of reusable slots; the top is the most recently freed
    free_list: Vec<Slot>,
    live: usize,
    retired: usize,
    limit: Option<usize>,
    policy: GenerationPolicy,
}

impl Allocator {
    /// Create an unbounded allocator
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            live: 0,
            retired: 0,
            limit: None,
            policy: GenerationPolicy::default(),
        }
    }

    /// Create an allocator that fails with [`AllocError::Exhausted`] once
    /// `limit` slots are in use
    ///
    /// Nothing is preallocated; slots are still created on demand up to the
    /// limit. Use [`Allocator::reserve`] to create them up front.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.min(MAX_SLOTS)),
            ..Self::new()
        }
    }

    /// Create an allocator from configuration
    ///
    /// The configuration is assumed to be validated; out-of-range values are
    /// clamped to what the slot width can address.
    pub fn from_config(config: &AllocatorConfig) -> Self {
        let mut allocator = match config.capacity {
            Some(limit) => Self::with_limit(limit),
            None => Self::new(),
        };
        allocator.policy = config.generation_policy;
        allocator.reserve(config.initial_reserve);
        allocator
    }

    /// Allocate a handle, reusing the most recently freed slot if there is one
    pub fn allocate(&mut self) -> Result<Handle, AllocError> {
        if let Some(slot) = self.free_list.pop() {
            let entry = &mut self.entries[slot as usize];
            debug_assert!(!entry.is_live, "free list held live slot {slot}");
            entry.is_live = true;
            self.live += 1;

            let handle = Handle::from_raw_parts(slot, entry.generation);
            log::trace!("Reused slot for handle {handle}");
            return Ok(handle);
        }

        let limit = self.limit.unwrap_or(MAX_SLOTS);
        if self.entries.len() >= limit {
            log::warn!(
                "Allocator exhausted: {} live, {} retired, limit {limit}",
                self.live,
                self.retired
            );
            return Err(AllocError::Exhausted { limit });
        }

        let slot = Slot::try_from(self.entries.len())
            .map_err(|_| AllocError::Exhausted { limit })?;
        self.entries.push(AllocEntry {
            is_live: true,
            generation: 0,
        });
        self.live += 1;

        let handle = Handle::from_raw_parts(slot, 0);
        log::trace!("Grew allocator to {} slots for handle {handle}", self.entries.len());
        Ok(handle)
    }

    /// Free a handle
    ///
    /// Returns true if the handle was live and is now freed. Stale handles and
    /// double frees return false and change nothing.
    pub fn free(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            log::trace!("Ignoring free of dead handle {handle}");
            return false;
        }

        let slot = handle.slot();
        let entry = &mut self.entries[handle.index()];
        entry.is_live = false;
        self.live -= 1;

        match entry.generation.checked_add(1) {
            Some(next) => {
                entry.generation = next;
                self.free_list.push(slot);
            }
            None => match self.policy {
                GenerationPolicy::Saturate => {
                    // Stays at the max generation and never reaches the free list again.
                    self.retired += 1;
                    log::warn!("Slot {slot} exhausted its generations and was retired");
                }
                GenerationPolicy::Wrap => {
                    entry.generation = 0;
                    self.free_list.push(slot);
                    log::warn!("Slot {slot} wrapped its generation back to 0");
                }
            },
        }

        log::trace!("Freed handle {handle}");
        true
    }

    /// Check whether `handle` refers to the current occupant of a live slot
    pub fn is_live(&self, handle: Handle) -> bool {
        self.entries
            .get(handle.index())
            .is_some_and(|e| e.is_live && e.generation == handle.generation())
    }

    /// Pre-create slots until `slots` exist in total
    ///
    /// Never shrinks and never goes past the configured limit. New slots are
    /// handed out lowest first, after any slots that were already free.
    pub fn reserve(&mut self, slots: usize) {
        let target = slots.min(self.limit.unwrap_or(MAX_SLOTS));
        let current = self.entries.len();
        if target <= current {
            return;
        }

        self.entries.resize(
            target,
            AllocEntry {
                is_live: false,
                generation: 0,
            },
        );
        // Both bounds are at most MAX_SLOTS, so every slot in between fits.
        let new_slots = (current..target).rev().map(|slot| slot as Slot);
        self.free_list.splice(0..0, new_slots);

        log::debug!("Reserved allocator slots {current}..{target}");
    }

    /// Iterate over every live handle in slot order
    pub fn iter_live(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_live)
            .map(|(slot, entry)| Handle::from_raw_parts(slot as Slot, entry.generation))
    }

    /// Total slots ever created
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no handle is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ready for reuse
    pub fn free_len(&self) -> usize {
        self.free_list.len()
    }

    /// Number of slots permanently removed from reuse
    pub fn retired_len(&self) -> usize {
        self.retired
    }

    /// The configured slot bound, if any
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The generation overflow policy in effect
    pub fn generation_policy(&self) -> GenerationPolicy {
        self.policy
    }

    #[cfg(test)]
    pub(crate) fn force_generation(&mut self, slot: Slot, generation: Generation) {
        self.entries[slot as usize].generation = generation;
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}
