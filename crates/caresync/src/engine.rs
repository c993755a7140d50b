//! The sync engine: the single call site application code uses.
//!
//! Every operation follows the same two-phase shape: apply the change to
//! the matching entity context synchronously (so the UI reflects it
//! immediately), then enqueue a mutation record for durable remote sync.
//! A failing local apply aborts the call before anything is queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use caresync_core::{EntityId, EntityKind, MutationId, MutationKind, MutationRecord};
use caresync_queue::{
    ConnectivityMonitor, MutationQueue, PermanentFailure, QueueConfig, Submission, Transport,
};
use caresync_store::DurableStore;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::context::EntityContext;
use crate::error::{EngineError, Result};

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Undo the optimistic local change when its remote sync permanently
    /// fails, so local and remote state converge again.
    pub rollback_on_failure: bool,
    /// Queue configuration.
    pub queue: QueueConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rollback_on_failure: true,
            queue: QueueConfig::default(),
        }
    }
}

/// Per-call options for `create` / `mutate` / `delete`.
#[derive(Debug, Clone, Default)]
pub struct MutateOptions {
    /// Explicit record id; derived from the target otherwise.
    pub mutation_id: Option<MutationId>,
    /// Snapshot of the entity before the change, kept for rollback.
    /// Mandatory for deletes.
    pub prior_state: Option<Value>,
}

type ContextRegistry = RwLock<HashMap<EntityKind, Arc<dyn EntityContext>>>;

/// The sync command façade.
///
/// Constructed once per process with its collaborators injected, then
/// shared by handle. One entity context is registered per [`EntityKind`];
/// dispatch is explicit by kind.
pub struct SyncEngine<S, T> {
    queue: MutationQueue<S, T>,
    contexts: Arc<ContextRegistry>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl<S, T> SyncEngine<S, T>
where
    S: DurableStore + 'static,
    T: Transport + 'static,
{
    /// Create an engine over the given store, transport and connectivity
    /// monitor.
    pub fn new(
        store: S,
        transport: T,
        connectivity: ConnectivityMonitor,
        config: EngineConfig,
    ) -> Self {
        let queue = MutationQueue::new(store, transport, connectivity, config.queue);
        let contexts: Arc<ContextRegistry> = Arc::new(RwLock::new(HashMap::new()));
        let last_error = Arc::new(Mutex::new(None));

        spawn_failure_listener(
            queue.subscribe_failures(),
            Arc::clone(&contexts),
            Arc::clone(&last_error),
            config.rollback_on_failure,
        );

        Self {
            queue,
            contexts,
            last_error,
        }
    }

    /// Register the context handling one entity kind, replacing any
    /// previous registration.
    pub fn register_context(&self, kind: EntityKind, context: Arc<dyn EntityContext>) {
        self.contexts.write().unwrap().insert(kind, context);
    }

    /// Reload pending mutations persisted by a previous process and start
    /// draining them. Returns the recovered count.
    pub async fn recover(&self) -> Result<usize> {
        Ok(self.queue.recover().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an entity: optimistic local insert, then durable enqueue.
    ///
    /// Returns the locally assigned id together with the submission handle;
    /// the id correlates the optimistic entity with its sync record.
    pub async fn create(
        &self,
        kind: EntityKind,
        payload: Value,
        opts: MutateOptions,
    ) -> Result<(EntityId, Submission)> {
        let context = self.context(kind)?;
        let id = context.apply_create(&payload)?;

        let mut builder = MutationRecord::builder(kind, MutationKind::Create)
            .target(id.clone())
            .endpoint(kind.base_endpoint())
            .payload(payload);
        if let Some(mutation_id) = opts.mutation_id {
            builder = builder.id(mutation_id);
        }

        let submission = self.queue.enqueue(builder.build()).await;
        tracing::debug!(%kind, entity = %id, "create applied and enqueued");
        Ok((id, submission))
    }

    /// Update an entity: optimistic local patch, then durable enqueue.
    pub async fn mutate(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Value,
        opts: MutateOptions,
    ) -> Result<Submission> {
        let context = self.context(kind)?;
        context.apply_update(id, &patch)?;

        let mut builder = MutationRecord::builder(kind, MutationKind::Update)
            .target(id.clone())
            .endpoint(kind.item_endpoint(id))
            .payload(patch)
            .prior_state(opts.prior_state);
        if let Some(mutation_id) = opts.mutation_id {
            builder = builder.id(mutation_id);
        }

        let submission = self.queue.enqueue(builder.build()).await;
        tracing::debug!(%kind, entity = %id, "update applied and enqueued");
        Ok(submission)
    }

    /// Delete an entity: optimistic local removal, then durable enqueue.
    ///
    /// `opts.prior_state` is mandatory so rollback has something to
    /// restore; the call is rejected before the local apply without it.
    pub async fn delete(
        &self,
        kind: EntityKind,
        id: &EntityId,
        opts: MutateOptions,
    ) -> Result<Submission> {
        let prior = opts.prior_state.ok_or(EngineError::MissingPriorState)?;

        let context = self.context(kind)?;
        context.apply_delete(id)?;

        let mut builder = MutationRecord::builder(kind, MutationKind::Delete)
            .target(id.clone())
            .endpoint(kind.item_endpoint(id))
            .prior_state(Some(prior));
        if let Some(mutation_id) = opts.mutation_id {
            builder = builder.id(mutation_id);
        }

        let submission = self.queue.enqueue(builder.build()).await;
        tracing::debug!(%kind, entity = %id, "delete applied and enqueued");
        Ok(submission)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    /// Mutations not yet synced, in send order.
    pub fn pending(&self) -> Vec<MutationRecord> {
        self.queue.pending()
    }

    /// Message of the most recent permanent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Subscribe to permanent-failure notifications.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<PermanentFailure> {
        self.queue.subscribe_failures()
    }

    fn context(&self, kind: EntityKind) -> Result<Arc<dyn EntityContext>> {
        self.contexts
            .read()
            .unwrap()
            .get(&kind)
            .cloned()
            .ok_or(EngineError::UnregisteredKind(kind))
    }
}

/// Watch the queue's failure broadcast: remember the message for
/// `last_error` and undo the optimistic change when configured to.
///
/// Exits when the queue (the broadcast sender) is dropped.
fn spawn_failure_listener(
    mut rx: broadcast::Receiver<PermanentFailure>,
    contexts: Arc<ContextRegistry>,
    last_error: Arc<Mutex<Option<String>>>,
    rollback_on_failure: bool,
) {
    tokio::spawn(async move {
        loop {
            let failure = match rx.recv().await {
                Ok(failure) => failure,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "failure notifications lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            *last_error.lock().unwrap() = Some(failure.error.clone());
            if !rollback_on_failure {
                continue;
            }

            let record = &failure.record;
            let Some(target) = record.target.as_ref() else {
                tracing::warn!(id = %record.id, "failed mutation has no target; cannot roll back");
                continue;
            };
            let context = contexts.read().unwrap().get(&record.entity).cloned();
            let Some(context) = context else {
                tracing::warn!(kind = %record.entity, "no context registered; cannot roll back");
                continue;
            };

            match context.apply_rollback(target, record.prior_state.as_ref()) {
                Ok(()) => {
                    tracing::info!(id = %record.id, entity = %target, "optimistic change rolled back")
                }
                Err(e) => {
                    tracing::warn!(id = %record.id, entity = %target, error = %e, "rollback failed")
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryContext;
    use caresync_queue::ScriptedTransport;
    use caresync_store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn make_engine(
        transport: Arc<ScriptedTransport>,
        online: bool,
    ) -> (
        SyncEngine<Arc<MemoryStore>, Arc<ScriptedTransport>>,
        Arc<MemoryContext>,
        ConnectivityMonitor,
    ) {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConnectivityMonitor::new(online);
        let config = EngineConfig {
            rollback_on_failure: true,
            queue: QueueConfig {
                max_attempts: 3,
                backoff_unit: Duration::from_millis(10),
            },
        };
        let engine = SyncEngine::new(store, transport, monitor.clone(), config);

        let patients = Arc::new(MemoryContext::new("patient"));
        engine.register_context(EntityKind::Patient, Arc::clone(&patients) as _);
        (engine, patients, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_applies_locally_and_enqueues() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, patients, _monitor) = make_engine(Arc::clone(&transport), false);

        let (id, _submission) = engine
            .create(
                EntityKind::Patient,
                json!({"firstName": "Jean"}),
                MutateOptions::default(),
            )
            .await
            .unwrap();

        // Visible immediately, before any network activity.
        assert_eq!(patients.get(&id).unwrap(), json!({"firstName": "Jean"}));
        let pending = engine.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].endpoint, "/patients");
        assert_eq!(pending[0].target.as_ref(), Some(&id));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutate_builds_item_endpoint() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, patients, _monitor) = make_engine(Arc::clone(&transport), true);

        let (id, submission) = engine
            .create(
                EntityKind::Patient,
                json!({"firstName": "Jean"}),
                MutateOptions::default(),
            )
            .await
            .unwrap();
        submission.synced().await.unwrap();

        let submission = engine
            .mutate(
                EntityKind::Patient,
                &id,
                json!({"firstName": "Jeanne"}),
                MutateOptions {
                    prior_state: Some(json!({"firstName": "Jean"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        submission.synced().await.unwrap();

        assert_eq!(patients.get(&id).unwrap(), json!({"firstName": "Jeanne"}));
        let endpoints = transport.sent_endpoints();
        assert_eq!(endpoints[0], "/patients");
        assert_eq!(endpoints[1], format!("/patients/{}", id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_apply_failure_queues_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, _patients, _monitor) = make_engine(Arc::clone(&transport), true);

        let err = engine
            .mutate(
                EntityKind::Patient,
                &EntityId::new("patient-99"),
                json!({"x": 1}),
                MutateOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Context(_)));
        assert!(engine.pending().is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_kind_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, _patients, _monitor) = make_engine(transport, true);

        let err = engine
            .create(
                EntityKind::Appointment,
                json!({"date": "2026-09-01"}),
                MutateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnregisteredKind(EntityKind::Appointment)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_requires_prior_state() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, patients, _monitor) = make_engine(transport, true);

        let (id, submission) = engine
            .create(
                EntityKind::Patient,
                json!({"firstName": "Jean"}),
                MutateOptions::default(),
            )
            .await
            .unwrap();
        submission.synced().await.unwrap();

        let err = engine
            .delete(EntityKind::Patient, &id, MutateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingPriorState));
        // Rejected before the local apply: the entity is still there.
        assert!(patients.get(&id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_rolls_back_update() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, patients, _monitor) = make_engine(Arc::clone(&transport), true);

        let (id, submission) = engine
            .create(
                EntityKind::Patient,
                json!({"firstName": "Jean"}),
                MutateOptions::default(),
            )
            .await
            .unwrap();
        submission.synced().await.unwrap();

        transport.push_retryable_times(3, "net down");
        let submission = engine
            .mutate(
                EntityKind::Patient,
                &id,
                json!({"firstName": "Wrong"}),
                MutateOptions {
                    prior_state: Some(json!({"firstName": "Jean"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Optimistically applied...
        assert_eq!(patients.get(&id).unwrap(), json!({"firstName": "Wrong"}));
        assert!(submission.synced().await.is_err());

        // ...then undone once the retry cap is exhausted.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(patients.get(&id).unwrap(), json!({"firstName": "Jean"}));
        assert!(engine.last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_rolls_back_create() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, patients, _monitor) = make_engine(Arc::clone(&transport), true);

        transport.push_rejected(422, "duplicate social security number");
        let (id, submission) = engine
            .create(
                EntityKind::Patient,
                json!({"firstName": "Jean"}),
                MutateOptions::default(),
            )
            .await
            .unwrap();

        assert!(submission.synced().await.is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(patients.get(&id).is_none(), "optimistic create undone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_counts_unsynced_changes() {
        let transport = Arc::new(ScriptedTransport::new());
        let (engine, _patients, monitor) = make_engine(Arc::clone(&transport), false);

        for n in 0..3 {
            engine
                .create(
                    EntityKind::Patient,
                    json!({"n": n}),
                    MutateOptions::default(),
                )
                .await
                .unwrap();
        }
        assert_eq!(engine.pending().len(), 3);

        monitor.set_online();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.pending().is_empty());
    }
}
