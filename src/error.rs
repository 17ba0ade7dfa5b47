//! # Store errors
//!
//! Every fallible operation in the library returns [`StoreError`]. The variants map
//! one-to-one onto caller mistakes (wrong dimension, bad index, malformed vector file)
//! plus the few environmental failures the glue layers can hit (I/O, worker pool,
//! embedding backend).
//!
//! None of these are transient: the store never retries, and a mutation that fails
//! leaves the slot array exactly as it was.

use std::path::PathBuf;

/// Errors returned by the vector store, its loader and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A vector argument does not have the store's fixed dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An index lies outside `[0, len)`.
    #[error("index {index} out of range for {len} slots")]
    IndexOutOfRange { index: usize, len: usize },

    /// A vector file's byte length is not `dimension * 4`.
    #[error("{}: expected {expected} bytes, found {actual}", path.display())]
    Format {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// The dimension is zero, or too large to address as a byte length.
    #[error("invalid vector dimension")]
    InvalidDimension,

    /// A dedicated scoring pool could not be started.
    #[error("failed to build scoring pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The embedding backend failed to produce a vector.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl StoreError {
    /// Shorthand used by every dimension check in the crate.
    pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<(), StoreError> {
        if expected == actual {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch { expected, actual })
        }
    }
}
