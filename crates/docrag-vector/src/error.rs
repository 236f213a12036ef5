//! Error types for docrag-vector.

use thiserror::Error;

/// Result type for docrag-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docrag-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Collection already exists.
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    /// Collection not found.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// A record with this id is already stored, or the id repeats within one batch.
    #[error("Record id '{0}' already exists")]
    DuplicateId(String),

    /// Dimension mismatch between vector and collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (empty, NaN or infinite components).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Persistence error (serialization, corrupt files).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
