//! Error types for the vector store and its persistence backends.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DotError>;

#[derive(Debug, Error)]
pub enum DotError {
    #[error("Dimension must be a positive number, got {0}")]
    InvalidDimension(usize),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Database not connected")]
    NotConnected,

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// Reported by an [`crate::Embedder`] that could not embed its input.
    #[error("Embedding failed: {0}")]
    Embedding(String),
}

/// Failures reported by a persistent store backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Record with id '{0}' already exists")]
    DuplicateId(String),

    #[error("{0}")]
    Backend(String),
}
