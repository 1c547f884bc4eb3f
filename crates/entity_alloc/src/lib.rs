//! # Entity Alloc
//!
//! Generational index allocation with generation-checked sparse arrays.
//!
//! ## Features
//!
//! - **Allocator**: Compact, reusable handles with per-slot generations
//! - **Indexed Stores**: Per-handle payload tables that reject stale handles
//! - **Shared Wrappers**: Mutex/RwLock wrappers for multi-threaded use
//! - **Host Boundary**: Opaque ids with explicit disposal for foreign callers
//! - **Configuration**: TOML/RON configuration files
//!
//! ## Quick Start
//!
//! ```rust
//! use entity_alloc::prelude::*;
//!
//! let mut allocator = Allocator::new();
//! let mut positions = IndexedStore::new();
//!
//! let entity = allocator.allocate()?;
//! positions.set(entity, (1.0, 2.0));
//! assert_eq!(positions.get(entity), Some(&(1.0, 2.0)));
//!
//! allocator.free(entity);
//! let reused = allocator.allocate()?;
//! assert_eq!(reused.slot(), entity.slot());
//! assert_eq!(positions.get(reused), None);
//! # Ok::<(), AllocError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod allocator;
pub mod boundary;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod store;
pub mod sync;

#[cfg(test)]
mod tests;

pub use allocator::Allocator;
pub use error::{AllocError, BoundaryError};
pub use handle::{Generation, Handle, Slot};
pub use store::IndexedStore;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        boundary::{AllocatorId, HostBindings, HostValue, StoreId},
        config::{AllocConfig, AllocatorConfig, Config, GenerationPolicy, StoreConfig},
        sync::{SharedAllocator, SharedStore},
        AllocError, Allocator, BoundaryError, Generation, Handle, IndexedStore, Slot,
    };
}
