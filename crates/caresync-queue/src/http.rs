//! HTTP transport: one request per mutation against the clinic's REST API.
//!
//! Maps the mutation kind onto POST/PUT/DELETE, serializes the payload as
//! JSON and attaches the bearer credential read from durable storage.
//! Error classification drives the queue's retry decision: connection
//! problems and 5xx responses are retryable, 4xx and a missing credential
//! are not.

use std::sync::Arc;

use async_trait::async_trait;
use caresync_core::{MutationKind, MutationRecord};
use caresync_store::DurableStore;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::{Result, Transport};

/// HTTP transport backed by reqwest.
pub struct HttpTransport<S> {
    client: reqwest::Client,
    base_url: String,
    store: Arc<S>,
}

impl<S: DurableStore> HttpTransport<S> {
    /// Create a transport for the given API base URL.
    ///
    /// The credential is re-read from the store on every send so a token
    /// written after startup is picked up without restarting the queue.
    pub fn new(base_url: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    fn url_for(&self, record: &MutationRecord) -> String {
        format!("{}{}", self.base_url, record.endpoint)
    }

    async fn credential(&self) -> Result<String> {
        match self.store.get_credential().await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(TransportError::MissingCredential),
            // A failing credential lookup is a storage hiccup, not proof
            // the credential is absent.
            Err(e) => Err(TransportError::Connection(format!(
                "credential lookup failed: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl<S: DurableStore> Transport for HttpTransport<S> {
    async fn send(&self, record: &MutationRecord) -> Result<Value> {
        let token = self.credential().await?;
        let url = self.url_for(record);

        let request = match record.kind {
            MutationKind::Create => self.client.post(&url).json(&record.payload),
            MutationKind::Update => self.client.put(&url).json(&record.payload),
            MutationKind::Delete => self.client.delete(&url),
        };

        tracing::debug!(id = %record.id, verb = %record.kind, %url, "sending mutation");

        let response = request
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransportError::Server {
                status: status.as_u16(),
                message: read_error_body(response).await,
            });
        }
        if status.is_client_error() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: read_error_body(response).await,
            });
        }

        // Some endpoints (deletes in particular) answer with no body.
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}
