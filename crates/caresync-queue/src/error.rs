//! Error types for the queue module.

use thiserror::Error;

use crate::queue::PermanentFailure;

/// Errors that can occur during a transport send.
///
/// The queue only cares about one distinction: [`is_retryable`]. Retryable
/// failures go through backoff up to the attempt cap; non-retryable ones
/// fail fast with a single attempt.
///
/// [`is_retryable`]: TransportError::is_retryable
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network unreachable or connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Remote 5xx response.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Remote 4xx response. The request is wrong; retrying cannot help.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No auth credential in durable storage. A configuration problem,
    /// not a network blip.
    #[error("missing auth credential")]
    MissingCredential,

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// Whether the queue should retry this failure with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connection(_)
            | TransportError::Timeout(_)
            | TransportError::Server { .. } => true,
            TransportError::Rejected { .. }
            | TransportError::MissingCredential
            | TransportError::MalformedResponse(_) => false,
        }
    }
}

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] caresync_store::StoreError),

    /// The record was discarded after exhausting its attempts (or on a
    /// non-retryable failure).
    #[error(
        "mutation {} permanently failed after {} attempts: {}",
        .0.record.id,
        .0.record.attempts,
        .0.error
    )]
    Failed(PermanentFailure),

    /// The queue was dropped before this record resolved.
    #[error("queue dropped before the mutation resolved")]
    Detached,
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
