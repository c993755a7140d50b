//! Queue snapshot encoding.
//!
//! The durable store persists the whole queue as one JSON array of records
//! under a single fixed key. There is no snapshot-level schema version; the
//! storage layer underneath is migration-versioned.

use thiserror::Error;

use crate::record::MutationRecord;

/// Fixed key under which the queue snapshot is stored.
pub const SNAPSHOT_KEY: &str = "pending_mutations";

/// Errors that can occur while encoding or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The stored bytes are not valid JSON or not record-shaped.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode the in-memory queue as the persisted snapshot string.
pub fn encode(records: &[MutationRecord]) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(records)?)
}

/// Decode a persisted snapshot back into records, preserving order.
pub fn decode(raw: &str) -> Result<Vec<MutationRecord>, SnapshotError> {
    Ok(serde_json::from_str(raw)?)
}

/// Decode, treating an empty or missing payload as an empty queue.
pub fn decode_or_empty(raw: Option<&str>) -> Result<Vec<MutationRecord>, SnapshotError> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) if s.trim().is_empty() => Ok(Vec::new()),
        Some(s) => decode(s),
    }
}
