//! Generational handle implementation
//!
//! A [`Handle`] names one occupancy of a slot. The slot number is reused once
//! the handle is freed, but the generation is not, so old copies of a handle
//! keep comparing unequal to whatever occupies the slot next.

use std::fmt;

/// Slot number type (position in the backing arrays)
pub type Slot = u32;

/// Per-slot reuse counter type
///
/// 32 bits wide. See [`GenerationPolicy`](crate::config::GenerationPolicy) for
/// what happens when a slot exhausts it.
pub type Generation = u32;

/// Generational index identifying a logical object across its allocate/free lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    slot: Slot,
    generation: Generation,
}

impl Handle {
    /// Build a handle from its raw parts
    ///
    /// Handles normally come from [`Allocator::allocate`](crate::Allocator::allocate).
    /// This exists for host bindings that round-trip handles through their own
    /// representation.
    pub const fn from_raw_parts(slot: Slot, generation: Generation) -> Self {
        Self { slot, generation }
    }

    /// Get the slot number
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Get the generation this handle was issued with
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the slot as a `usize` for indexing
    pub const fn index(&self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_handle_equality_needs_both_fields() {
        let a = Handle::from_raw_parts(3, 1);

        assert_eq!(a, Handle::from_raw_parts(3, 1));
        assert_ne!(a, Handle::from_raw_parts(3, 2));
        assert_ne!(a, Handle::from_raw_parts(4, 1));
    }

    #[test]
    fn test_handle_hash_distinguishes_generations() {
        let mut set = HashSet::new();
        set.insert(Handle::from_raw_parts(0, 0));
        set.insert(Handle::from_raw_parts(0, 1));
        set.insert(Handle::from_raw_parts(0, 0));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_handle_display() {
        let handle = Handle::from_raw_parts(12, 7);
        assert_eq!(handle.to_string(), "12v7");
        assert_eq!(handle.index(), 12);
    }
}
