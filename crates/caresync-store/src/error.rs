//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Snapshot serialization/deserialization error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] caresync_core::SnapshotError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Storage is unavailable (disabled or unreachable).
    ///
    /// Callers degrade to memory-only operation on this; it is logged,
    /// never surfaced to façade callers.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
