//! Error types for the engine.

use caresync_core::EntityKind;
use caresync_queue::QueueError;
use caresync_store::StoreError;
use thiserror::Error;

use crate::context::ContextError;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The optimistic local apply failed; nothing was queued.
    #[error("local apply failed: {0}")]
    Context(#[from] ContextError),

    /// Queue error.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// No entity context registered for this kind.
    #[error("no entity context registered for {0}")]
    UnregisteredKind(EntityKind),

    /// Deletes must carry the prior entity state so rollback has
    /// something to restore.
    #[error("delete requires the prior entity state")]
    MissingPriorState,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
