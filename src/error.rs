//! Error types for bitforest.

use thiserror::Error;

/// Errors that can occur while building, querying, or persisting a forest.
#[derive(Debug, Error)]
pub enum ForestError {
    /// Mutation attempted after the forest was built.
    #[error("index already built, cannot add more items")]
    AlreadyBuilt,

    /// A built-only operation was called on an unbuilt index.
    #[error("index not built")]
    NotBuilt,

    /// `build` was called before any item was added.
    #[error("no items added")]
    NoItems,

    /// Vector length does not match the index dimension.
    #[error("bad vector dimension: expected {expected} words, got {got}")]
    BadDim { expected: usize, got: usize },

    /// A loaded file was written with a different dimension.
    #[error("dimension mismatch: index has {expected} words, file has {got}")]
    DimMismatch { expected: i32, got: i32 },

    /// Underlying open/read/write/mmap failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The allocator refused to grow the node arena.
    #[error("out of memory while growing node arena")]
    OutOfMemory,
}

/// Result type alias for bitforest operations.
pub type Result<T> = std::result::Result<T, ForestError>;
