//! DurableStore trait: the abstract interface for queue persistence.
//!
//! This trait keeps the mutation queue storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests and degraded mode).

use async_trait::async_trait;
use caresync_core::MutationRecord;

use crate::error::Result;

/// The DurableStore trait: async interface for queue persistence.
///
/// The queue is the sole writer of the snapshot; no other component may
/// splice or reorder the persisted sequence. The snapshot must always equal
/// the in-memory sequence after every enqueue, dequeue, or attempt-count
/// change.
///
/// # Design Notes
///
/// - **Whole-snapshot writes**: the queue is small (pending work for one
///   client), so every mutation rewrites the full snapshot atomically.
/// - **Best-effort durability**: a failing save degrades the queue to
///   memory-only for the current process lifetime; it is not a correctness
///   requirement.
/// - **Credential storage**: the auth token consumed by the HTTP transport
///   lives next to the snapshot so a restarted process can resume syncing.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist the whole queue, replacing any previous snapshot.
    async fn save_snapshot(&self, records: &[MutationRecord]) -> Result<()>;

    /// Load the persisted queue, in insertion order.
    ///
    /// Returns an empty vector when no snapshot has been saved yet.
    async fn load_snapshot(&self) -> Result<Vec<MutationRecord>>;

    /// Store the auth credential used by the transport.
    async fn put_credential(&self, token: &str) -> Result<()>;

    /// Fetch the auth credential, if one has been stored.
    async fn get_credential(&self) -> Result<Option<String>>;
}

#[async_trait]
impl<S: DurableStore + ?Sized> DurableStore for std::sync::Arc<S> {
    async fn save_snapshot(&self, records: &[MutationRecord]) -> Result<()> {
        (**self).save_snapshot(records).await
    }

    async fn load_snapshot(&self) -> Result<Vec<MutationRecord>> {
        (**self).load_snapshot().await
    }

    async fn put_credential(&self, token: &str) -> Result<()> {
        (**self).put_credential(token).await
    }

    async fn get_credential(&self) -> Result<Option<String>> {
        (**self).get_credential().await
    }
}
