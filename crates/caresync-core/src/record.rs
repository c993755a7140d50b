//! The mutation record: one durable unit of pending work.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntityId, EntityKind, MutationId, MutationKind};

/// A pending command awaiting remote synchronization.
///
/// Records are appended to the mutation queue in call order and sent
/// strictly FIFO. A record is mutated in place (`attempts`) on transient
/// failure and removed on success or on reaching the retry cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Unique id, assigned at enqueue time.
    pub id: MutationId,
    /// Which entity context this mutation belongs to.
    pub entity: EntityKind,
    /// The entity this mutation targets, when known.
    ///
    /// For creates this is the locally assigned id, used to correlate the
    /// optimistic entity with its sync record (and to roll it back).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
    /// Create, update or delete; maps to the transport verb.
    pub kind: MutationKind,
    /// Remote resource path for this command.
    pub endpoint: String,
    /// Opaque body to send. Null for deletes.
    pub payload: Value,
    /// Snapshot of the entity before the optimistic change.
    ///
    /// Consulted by the rollback path on permanent failure. Mandatory for
    /// deletes, optional otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<Value>,
    /// Creation time, Unix ms. Used only for id disambiguation.
    pub created_at: i64,
    /// Failed send count. Starts at 0.
    #[serde(default)]
    pub attempts: u32,
}

impl MutationRecord {
    /// Start building a record.
    pub fn builder(entity: EntityKind, kind: MutationKind) -> MutationRecordBuilder {
        MutationRecordBuilder {
            id: None,
            entity,
            kind,
            target: None,
            endpoint: None,
            payload: Value::Null,
            prior_state: None,
            created_at: now_millis(),
        }
    }
}

/// Builder for [`MutationRecord`].
#[derive(Debug)]
pub struct MutationRecordBuilder {
    id: Option<MutationId>,
    entity: EntityKind,
    kind: MutationKind,
    target: Option<EntityId>,
    endpoint: Option<String>,
    payload: Value,
    prior_state: Option<Value>,
    created_at: i64,
}

impl MutationRecordBuilder {
    /// Use an explicit, caller-supplied id.
    pub fn id(mut self, id: MutationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the target entity.
    pub fn target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the remote endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the payload to send.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Attach the pre-change entity snapshot.
    pub fn prior_state(mut self, prior: Option<Value>) -> Self {
        self.prior_state = prior;
        self
    }

    /// Override the creation timestamp (Unix ms).
    pub fn created_at(mut self, at: i64) -> Self {
        self.created_at = at;
        self
    }

    /// Finish the record. When the caller supplied no id, one is derived
    /// from the target entity (falling back to the endpoint) plus the
    /// creation timestamp.
    pub fn build(self) -> MutationRecord {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| self.entity.base_endpoint().to_string());
        let id = self.id.unwrap_or_else(|| {
            let disambiguator = self
                .target
                .as_ref()
                .map(|t| t.as_str())
                .unwrap_or(endpoint.as_str());
            MutationId::derive(disambiguator, self.created_at)
        });
        MutationRecord {
            id,
            entity: self.entity,
            kind: self.kind,
            target: self.target,
            endpoint,
            payload: self.payload,
            prior_state: self.prior_state,
            created_at: self.created_at,
            attempts: 0,
        }
    }
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let record = MutationRecord::builder(EntityKind::Patient, MutationKind::Update)
            .endpoint("/patients/42")
            .payload(json!({"firstName": "Jean"}))
            .created_at(1700000000000)
            .build();

        assert_eq!(record.id.as_str(), "/patients/42-1700000000000");
        assert_eq!(record.attempts, 0);
        assert!(record.prior_state.is_none());
    }

    #[test]
    fn test_builder_derives_id_from_target() {
        let record = MutationRecord::builder(EntityKind::Patient, MutationKind::Update)
            .target(crate::EntityId::new("42"))
            .endpoint("/patients/42")
            .payload(json!({"firstName": "Jean"}))
            .created_at(1700000000000)
            .build();

        assert_eq!(record.id.as_str(), "42-1700000000000");
    }

    #[test]
    fn test_builder_explicit_id() {
        let record = MutationRecord::builder(EntityKind::Appointment, MutationKind::Delete)
            .id(MutationId::new("mut-7"))
            .endpoint("/appointments/7")
            .prior_state(Some(json!({"date": "2026-09-01"})))
            .build();

        assert_eq!(record.id.as_str(), "mut-7");
        assert_eq!(record.payload, Value::Null);
        assert!(record.prior_state.is_some());
    }
}
