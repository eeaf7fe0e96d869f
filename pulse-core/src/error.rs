//! Error types for the PULSE core library.

use thiserror::Error;

/// Top-level error type for store, config and record operations.
#[derive(Error, Debug)]
pub enum PulseError {
    /// An embedding's dimensionality differs from the vectors already stored.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the vectors already in the store.
        expected: usize,
        /// Dimensionality of the rejected vector.
        actual: usize,
    },

    /// A record was offered without any embedding components.
    #[error("Refusing to store a notification without an embedding")]
    EmptyEmbedding,

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PulseError>;
