//! Error types
//!
//! Only true precondition failures are errors. A stale or unknown handle is an
//! ordinary outcome and is reported through `bool`/`Option` returns instead.

use thiserror::Error;

/// Allocation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Every slot up to the configured bound is live (or retired)
    #[error("Allocator exhausted: all {limit} slots are in use")]
    Exhausted {
        /// The configured slot bound
        limit: usize,
    },
}

/// Kind of object behind a host id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// An allocator created through the host boundary
    Allocator,
    /// A store created through the host boundary
    Store,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allocator => f.write_str("allocator"),
            Self::Store => f.write_str("store"),
        }
    }
}

/// Host boundary errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryError {
    /// The id was disposed (or never issued by this binding)
    #[error("{0} has been disposed")]
    Disposed(ObjectKind),

    /// Allocation failed
    #[error(transparent)]
    Alloc(#[from] AllocError),
}
