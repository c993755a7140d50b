//! In-memory implementation of the DurableStore trait.
//!
//! This is primarily for testing and for degraded (storage-disabled)
//! operation. It has the same semantics as SQLite but keeps everything in
//! memory with no persistence.

use std::sync::RwLock;

use async_trait::async_trait;
use caresync_core::{snapshot, MutationRecord};

use crate::error::Result;
use crate::traits::DurableStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
/// The snapshot is held in its encoded form so serialization errors show
/// up in tests exactly as they would against SQLite.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Encoded queue snapshot, if any.
    snapshot: Option<String>,
    /// Auth credential, if any.
    credential: Option<String>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn save_snapshot(&self, records: &[MutationRecord]) -> Result<()> {
        let encoded = snapshot::encode(records)?;
        let mut inner = self.inner.write().unwrap();
        inner.snapshot = Some(encoded);
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Vec<MutationRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(snapshot::decode_or_empty(inner.snapshot.as_deref())?)
    }

    async fn put_credential(&self, token: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.credential = Some(token.to_string());
        Ok(())
    }

    async fn get_credential(&self) -> Result<Option<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caresync_core::{EntityKind, MutationKind};
    use serde_json::json;

    fn make_record(n: i64) -> MutationRecord {
        MutationRecord::builder(EntityKind::Patient, MutationKind::Update)
            .endpoint(format!("/patients/{}", n))
            .payload(json!({"seq": n}))
            .created_at(n)
            .build()
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let records = vec![make_record(1), make_record(2)];

        store.save_snapshot(&records).await.unwrap();
        let loaded = store.load_snapshot().await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_memory_store_empty_before_first_save() {
        let store = MemoryStore::new();
        assert!(store.load_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_save_replaces() {
        let store = MemoryStore::new();
        store
            .save_snapshot(&[make_record(1), make_record(2)])
            .await
            .unwrap();
        store.save_snapshot(&[make_record(2)]).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].endpoint, "/patients/2");
    }

    #[tokio::test]
    async fn test_memory_store_credential() {
        let store = MemoryStore::new();
        assert!(store.get_credential().await.unwrap().is_none());

        store.put_credential("token-123").await.unwrap();
        assert_eq!(
            store.get_credential().await.unwrap().as_deref(),
            Some("token-123")
        );
    }
}
