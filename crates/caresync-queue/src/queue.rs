//! The mutation queue: durable, ordered, at-least-once delivery of pending
//! commands to the transport.
//!
//! Records drain strictly FIFO at the whole-queue level; a later mutation
//! never reaches the transport before an earlier one has succeeded or been
//! permanently discarded. A stuck head therefore blocks the queue until it
//! resolves or exhausts its attempts - a deliberate ordering trade-off.
//!
//! After every enqueue, dequeue or attempt-count change the full snapshot
//! is rewritten to the durable store, so memory and storage never diverge
//! for longer than one step. Saves are version-gated: a slow write can
//! never overwrite a newer snapshot. Snapshot failures degrade the queue
//! to memory-only and are logged, never surfaced to callers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use caresync_core::{MutationId, MutationRecord};
use caresync_store::DurableStore;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use crate::connectivity::ConnectivityMonitor;
use crate::error::{QueueError, Result};
use crate::transport::Transport;

/// Configuration for queue behavior.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Sends per record before it is discarded as permanently failed.
    pub max_attempts: u32,
    /// Base unit for exponential backoff; the wait after the n-th failed
    /// attempt is `backoff_unit * 2^n`.
    pub backoff_unit: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Broadcast notification for a record discarded after its last attempt.
///
/// `record.attempts` carries the final attempt count; UI code subscribes to
/// present "this change could not be saved" without polling.
#[derive(Debug, Clone)]
pub struct PermanentFailure {
    pub record: MutationRecord,
    pub error: String,
}

/// Handle returned by [`MutationQueue::enqueue`].
///
/// The record is durably submitted by the time the handle exists; awaiting
/// [`synced`] additionally waits for remote resolution (success or
/// permanent failure). Dropping the handle detaches the caller without
/// affecting the queued record.
///
/// [`synced`]: Submission::synced
#[derive(Debug)]
pub struct Submission {
    id: MutationId,
    rx: oneshot::Receiver<SyncOutcome>,
}

type SyncOutcome = std::result::Result<Value, PermanentFailure>;

impl Submission {
    /// Id of the enqueued record.
    pub fn id(&self) -> &MutationId {
        &self.id
    }

    /// Wait until the record has been synced or discarded.
    pub async fn synced(self) -> Result<Value> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => Err(QueueError::Failed(failure)),
            Err(_) => Err(QueueError::Detached),
        }
    }
}

/// The durable, ordered command queue.
///
/// Explicitly constructed with its collaborators injected; cloning yields
/// another handle to the same queue.
pub struct MutationQueue<S, T> {
    inner: Arc<Inner<S, T>>,
}

impl<S, T> Clone for MutationQueue<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, T> {
    store: S,
    transport: T,
    connectivity: ConnectivityMonitor,
    config: QueueConfig,
    state: Mutex<QueueState>,
    /// Version of the last snapshot written (or skipped as stale).
    /// Held across the store write, so saves are serialized and a write
    /// for an older version than the last one is dropped.
    persist_gate: tokio::sync::Mutex<u64>,
    failures: broadcast::Sender<PermanentFailure>,
}

#[derive(Default)]
struct QueueState {
    /// Pending records, FIFO by insertion order.
    records: VecDeque<MutationRecord>,
    /// Bumped on every change to `records`; orders snapshot saves.
    version: u64,
    /// Re-entrancy guard: at most one drain loop at a time.
    draining: bool,
    /// Live completion waiters, keyed by record id.
    waiters: HashMap<MutationId, oneshot::Sender<SyncOutcome>>,
}

impl<S, T> MutationQueue<S, T>
where
    S: DurableStore + 'static,
    T: Transport + 'static,
{
    /// Create a queue over the given store, transport and connectivity
    /// monitor.
    ///
    /// Spawns a listener that re-arms the drain loop on every transition
    /// to online. Call [`recover`] afterwards to reload pending work from
    /// a previous process.
    ///
    /// [`recover`]: MutationQueue::recover
    pub fn new(store: S, transport: T, connectivity: ConnectivityMonitor, config: QueueConfig) -> Self {
        let (failures, _) = broadcast::channel(64);
        let inner = Arc::new(Inner {
            store,
            transport,
            connectivity: connectivity.clone(),
            config,
            state: Mutex::new(QueueState::default()),
            persist_gate: tokio::sync::Mutex::new(0),
            failures,
        });

        spawn_online_listener(Arc::downgrade(&inner), connectivity);

        Self { inner }
    }

    /// Reload the persisted snapshot from a previous process.
    ///
    /// Recovered records drain ahead of anything enqueued since; their
    /// original waiters are gone, so resolution is observable only through
    /// the failure broadcast and [`pending`]. Returns the recovered count.
    ///
    /// [`pending`]: MutationQueue::pending
    pub async fn recover(&self) -> Result<usize> {
        let recovered = self.inner.store.load_snapshot().await?;
        let count = recovered.len();
        let (version, snapshot) = {
            let mut state = self.inner.state.lock().unwrap();
            for record in recovered.into_iter().rev() {
                state.records.push_front(record);
            }
            capture(&mut state)
        };
        self.inner.persist(version, &snapshot).await;
        tracing::info!(count, "recovered pending mutations from durable store");
        Inner::maybe_drain(&self.inner);
        Ok(count)
    }

    /// Append a record at the tail, persist, and start (or let continue)
    /// the drain loop if online.
    ///
    /// The returned [`Submission`] is durably submitted when this returns;
    /// await its `synced` future for remote resolution.
    pub async fn enqueue(&self, record: MutationRecord) -> Submission {
        let id = record.id.clone();
        let (tx, rx) = oneshot::channel();

        let (version, snapshot) = {
            let mut state = self.inner.state.lock().unwrap();
            state.records.push_back(record);
            state.waiters.insert(id.clone(), tx);
            capture(&mut state)
        };
        self.inner.persist(version, &snapshot).await;

        tracing::debug!(id = %id, pending = snapshot.len(), "mutation enqueued");
        Inner::maybe_drain(&self.inner);

        Submission { id, rx }
    }

    /// Current queue contents, in send order. For "N changes not yet
    /// synced" introspection.
    pub fn pending(&self) -> Vec<MutationRecord> {
        let state = self.inner.state.lock().unwrap();
        snapshot_of(&state)
    }

    /// Subscribe to permanent-failure notifications.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<PermanentFailure> {
        self.inner.failures.subscribe()
    }
}

fn snapshot_of(state: &QueueState) -> Vec<MutationRecord> {
    state.records.iter().cloned().collect()
}

/// Bump the state version and clone the queue for persistence. Must run
/// inside the same critical section as the change it captures, so versions
/// order snapshots exactly as the changes happened.
fn capture(state: &mut QueueState) -> (u64, Vec<MutationRecord>) {
    state.version += 1;
    (state.version, snapshot_of(state))
}

/// Re-arm the drain loop whenever connectivity comes back.
///
/// Holds only a weak reference so a dropped queue tears the listener down.
fn spawn_online_listener<S, T>(inner: Weak<Inner<S, T>>, connectivity: ConnectivityMonitor)
where
    S: DurableStore + 'static,
    T: Transport + 'static,
{
    let mut rx = connectivity.watch();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if !online {
                continue;
            }
            match inner.upgrade() {
                Some(inner) => Inner::maybe_drain(&inner),
                None => break,
            }
        }
    });
}

impl<S, T> Inner<S, T>
where
    S: DurableStore + 'static,
    T: Transport + 'static,
{
    /// Start a drain task unless one is already running, the queue is
    /// empty, or we are offline. Checked and set under the state lock, so
    /// concurrent triggers start at most one loop.
    fn maybe_drain(inner: &Arc<Self>) {
        if !inner.connectivity.is_online() {
            return;
        }
        {
            let mut state = inner.state.lock().unwrap();
            if state.draining || state.records.is_empty() {
                return;
            }
            state.draining = true;
        }
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            Self::drain(inner).await;
        });
    }

    /// The drain loop: strictly sequential, one in-flight send at a time,
    /// head-of-queue only.
    async fn drain(inner: Arc<Self>) {
        tracing::debug!("drain loop started");
        loop {
            // Consulted before every transport call so an in-flight loop
            // stops promptly when connectivity drops.
            if !inner.connectivity.is_online() {
                inner.state.lock().unwrap().draining = false;
                tracing::debug!("offline; drain loop paused");
                // Connectivity may have returned between the check and the
                // flag reset; the listener saw `draining == true` then and
                // skipped, so re-arm here.
                if inner.connectivity.is_online() {
                    Self::maybe_drain(&inner);
                }
                return;
            }

            let head = {
                let mut state = inner.state.lock().unwrap();
                match state.records.front() {
                    Some(record) => Some(record.clone()),
                    None => {
                        state.draining = false;
                        None
                    }
                }
            };
            let Some(record) = head else {
                tracing::debug!("queue drained");
                return;
            };

            match inner.transport.send(&record).await {
                Ok(result) => {
                    let (version, snapshot) = inner.remove_record(&record.id);
                    inner.persist(version, &snapshot).await;
                    tracing::debug!(id = %record.id, "mutation synced");
                    inner.resolve(&record.id, Ok(result));
                }
                Err(err) => {
                    let attempts = record.attempts + 1;
                    let exhausted = attempts >= inner.config.max_attempts;
                    if err.is_retryable() && !exhausted {
                        let (version, snapshot) = {
                            let mut state = inner.state.lock().unwrap();
                            // Matched by id: recovery may have pushed
                            // records ahead of the one in flight.
                            if let Some(pending) =
                                state.records.iter_mut().find(|r| r.id == record.id)
                            {
                                pending.attempts = attempts;
                            }
                            capture(&mut state)
                        };
                        inner.persist(version, &snapshot).await;

                        let delay = inner.config.backoff_unit * 2u32.pow(attempts);
                        tracing::warn!(
                            id = %record.id,
                            attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "send failed; backing off"
                        );
                        tokio::time::sleep(delay).await;
                        // Same head retried on the next iteration.
                    } else {
                        let (version, snapshot) = inner.remove_record(&record.id);
                        inner.persist(version, &snapshot).await;

                        let mut failed = record.clone();
                        failed.attempts = attempts;
                        let failure = PermanentFailure {
                            record: failed,
                            error: err.to_string(),
                        };
                        tracing::error!(
                            id = %record.id,
                            attempts,
                            retryable = err.is_retryable(),
                            error = %err,
                            "mutation permanently failed"
                        );
                        // No subscribers is fine; the waiter still resolves.
                        let _ = inner.failures.send(failure.clone());
                        inner.resolve(&record.id, Err(failure));
                    }
                }
            }
        }
    }

    /// Remove a resolved record wherever it sits and return the new
    /// snapshot. Removal matches by id, not position: `recover` may have
    /// pushed records in front of the one the drain loop sent.
    fn remove_record(&self, id: &MutationId) -> (u64, Vec<MutationRecord>) {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.records.iter().position(|r| r.id == *id) {
            state.records.remove(pos);
        }
        capture(&mut state)
    }

    /// Persist a snapshot, degrading to memory-only on failure.
    ///
    /// The gate serializes writes and drops any save whose version is
    /// older than the last one written, so a slow store call cannot
    /// overwrite a newer snapshot with stale state.
    async fn persist(&self, version: u64, records: &[MutationRecord]) {
        let mut last_saved = self.persist_gate.lock().await;
        if version <= *last_saved {
            tracing::debug!(version, "stale snapshot save skipped");
            return;
        }
        if let Err(e) = self.store.save_snapshot(records).await {
            tracing::warn!(error = %e, "snapshot save failed; continuing memory-only");
        }
        *last_saved = version;
    }

    /// Resolve the waiter for a record, if the caller still holds one.
    fn resolve(&self, id: &MutationId, outcome: SyncOutcome) {
        let waiter = self.state.lock().unwrap().waiters.remove(id);
        if let Some(tx) = waiter {
            let _ = tx.send(outcome);
        }
    }
}
