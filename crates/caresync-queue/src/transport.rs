//! Transport abstraction for remote mutation delivery.
//!
//! The transport performs exactly one remote call per mutation record and
//! reports success or failure. Implementations may use HTTP (the default,
//! see [`crate::http`]), or anything else that can carry one request per
//! mutation.

use async_trait::async_trait;
use caresync_core::MutationRecord;
use serde_json::Value;

use crate::error::TransportError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport trait for delivering one mutation to the remote service.
///
/// Implementations must be thread-safe (Send + Sync). The queue guarantees
/// at most one in-flight `send` at a time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one record. Returns the parsed success body.
    async fn send(&self, record: &MutationRecord) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, record: &MutationRecord) -> Result<Value> {
        (**self).send(record).await
    }
}

/// A scripted in-memory transport for testing.
///
/// Outcomes are queued ahead of time and consumed one per send; when the
/// script runs out, sends succeed with a null body. Every send is recorded
/// with its timestamp so tests can assert ordering and backoff spacing.
pub mod memory {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    use caresync_core::MutationId;

    /// One observed call to `send`.
    #[derive(Debug, Clone)]
    pub struct SendAttempt {
        pub id: MutationId,
        pub endpoint: String,
        pub payload: Value,
        pub at: Instant,
    }

    struct Scripted {
        delay: Option<Duration>,
        result: Result<Value>,
    }

    #[derive(Default)]
    struct ScriptInner {
        script: VecDeque<Scripted>,
        log: Vec<SendAttempt>,
    }

    /// Scripted transport implementation.
    pub struct ScriptedTransport {
        inner: Mutex<ScriptInner>,
    }

    impl ScriptedTransport {
        /// Create a transport whose every send succeeds immediately.
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(ScriptInner::default()),
            }
        }

        /// Queue a successful response.
        pub fn push_ok(&self, value: Value) {
            self.push(None, Ok(value));
        }

        /// Queue a successful response delivered after a delay.
        pub fn push_ok_after(&self, delay: Duration, value: Value) {
            self.push(Some(delay), Ok(value));
        }

        /// Queue a retryable failure (network-style).
        pub fn push_retryable(&self, message: &str) {
            self.push(None, Err(TransportError::Connection(message.into())));
        }

        /// Queue `n` consecutive retryable failures.
        pub fn push_retryable_times(&self, n: usize, message: &str) {
            for _ in 0..n {
                self.push_retryable(message);
            }
        }

        /// Queue a non-retryable rejection (4xx-style).
        pub fn push_rejected(&self, status: u16, message: &str) {
            self.push(
                None,
                Err(TransportError::Rejected {
                    status,
                    message: message.into(),
                }),
            );
        }

        /// Queue an arbitrary transport error.
        pub fn push_error(&self, error: TransportError) {
            self.push(None, Err(error));
        }

        fn push(&self, delay: Option<Duration>, result: Result<Value>) {
            let mut inner = self.inner.lock().unwrap();
            inner.script.push_back(Scripted { delay, result });
        }

        /// Everything sent so far, in call order.
        pub fn sent(&self) -> Vec<SendAttempt> {
            self.inner.lock().unwrap().log.clone()
        }

        /// Endpoints sent so far, in call order.
        pub fn sent_endpoints(&self) -> Vec<String> {
            self.sent().into_iter().map(|a| a.endpoint).collect()
        }
    }

    impl Default for ScriptedTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, record: &MutationRecord) -> Result<Value> {
            let scripted = {
                let mut inner = self.inner.lock().unwrap();
                inner.log.push(SendAttempt {
                    id: record.id.clone(),
                    endpoint: record.endpoint.clone(),
                    payload: record.payload.clone(),
                    at: Instant::now(),
                });
                inner.script.pop_front()
            };

            match scripted {
                Some(s) => {
                    if let Some(delay) = s.delay {
                        tokio::time::sleep(delay).await;
                    }
                    s.result
                }
                None => Ok(Value::Null),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::ScriptedTransport;
    use super::*;
    use caresync_core::{EntityKind, MutationKind};
    use serde_json::json;

    fn make_record(endpoint: &str) -> MutationRecord {
        MutationRecord::builder(EntityKind::Patient, MutationKind::Update)
            .endpoint(endpoint)
            .payload(json!({"x": 1}))
            .build()
    }

    #[tokio::test]
    async fn test_scripted_outcomes_consumed_in_order() {
        let transport = ScriptedTransport::new();
        transport.push_retryable("net down");
        transport.push_ok(json!({"ok": true}));

        let record = make_record("/patients/1");
        assert!(transport.send(&record).await.is_err());
        assert_eq!(transport.send(&record).await.unwrap(), json!({"ok": true}));

        // Exhausted script defaults to success.
        assert_eq!(transport.send(&record).await.unwrap(), Value::Null);
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_send_log_captures_order() {
        let transport = ScriptedTransport::new();
        transport.send(&make_record("/patients/1")).await.unwrap();
        transport.send(&make_record("/patients/2")).await.unwrap();

        assert_eq!(
            transport.sent_endpoints(),
            vec!["/patients/1".to_string(), "/patients/2".to_string()]
        );
    }
}
