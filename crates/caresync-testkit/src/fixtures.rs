//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use caresync_core::{EntityId, EntityKind, MutationKind, MutationRecord};
use caresync_queue::{ConnectivityMonitor, MutationQueue, QueueConfig, ScriptedTransport};
use caresync_store::MemoryStore;
use serde_json::json;

/// A queue config with short backoff, sized for paused-clock tests.
pub fn fast_config() -> QueueConfig {
    QueueConfig {
        max_attempts: 3,
        backoff_unit: Duration::from_millis(100),
    }
}

/// A test fixture wiring a memory store, scripted transport and
/// connectivity monitor into one queue.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<ScriptedTransport>,
    pub monitor: ConnectivityMonitor,
    pub queue: MutationQueue<Arc<MemoryStore>, Arc<ScriptedTransport>>,
}

impl TestFixture {
    /// Create a fixture that starts online.
    pub fn online() -> Self {
        Self::with_config(true, fast_config())
    }

    /// Create a fixture that starts offline.
    pub fn offline() -> Self {
        Self::with_config(false, fast_config())
    }

    /// Create a fixture with explicit connectivity and queue config.
    pub fn with_config(online: bool, config: QueueConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::new());
        let monitor = ConnectivityMonitor::new(online);
        let queue = MutationQueue::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            monitor.clone(),
            config,
        );
        Self {
            store,
            transport,
            monitor,
            queue,
        }
    }

    /// Build a fresh queue over this fixture's store, simulating a
    /// process restart. The transport and monitor are new as well.
    pub fn restart(&self) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let monitor = ConnectivityMonitor::new(true);
        let queue = MutationQueue::new(
            Arc::clone(&self.store),
            Arc::clone(&transport),
            monitor.clone(),
            fast_config(),
        );
        Self {
            store: Arc::clone(&self.store),
            transport,
            monitor,
            queue,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::online()
    }
}

/// A patient create record with a numbered payload.
pub fn patient_create(n: u32) -> MutationRecord {
    MutationRecord::builder(EntityKind::Patient, MutationKind::Create)
        .target(EntityId::new(format!("patient-{n}")))
        .endpoint(EntityKind::Patient.base_endpoint())
        .payload(json!({"firstName": format!("Patient {n}")}))
        .created_at(n as i64)
        .build()
}

/// A patient update record against the given entity.
pub fn patient_update(id: &str, n: u32) -> MutationRecord {
    let target = EntityId::new(id);
    MutationRecord::builder(EntityKind::Patient, MutationKind::Update)
        .endpoint(EntityKind::Patient.item_endpoint(&target))
        .target(target)
        .payload(json!({"rev": n}))
        .created_at(n as i64)
        .build()
}

/// A patient delete record carrying its prior state.
pub fn patient_delete(id: &str, prior: serde_json::Value) -> MutationRecord {
    let target = EntityId::new(id);
    MutationRecord::builder(EntityKind::Patient, MutationKind::Delete)
        .endpoint(EntityKind::Patient.item_endpoint(&target))
        .target(target)
        .prior_state(Some(prior))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fixture_drains_on_enqueue() {
        let fixture = TestFixture::online();
        let submission = fixture.queue.enqueue(patient_create(1)).await;
        submission.synced().await.unwrap();
        assert_eq!(fixture.transport.sent_endpoints(), vec!["/patients"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_shares_the_store() {
        let fixture = TestFixture::offline();
        fixture.queue.enqueue(patient_create(1)).await;

        let restarted = fixture.restart();
        assert_eq!(restarted.queue.recover().await.unwrap(), 1);
    }
}
