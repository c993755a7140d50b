//! Strong type definitions for the Caresync core.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a queued mutation.
///
/// Caller-suppliable; otherwise derived from the target entity id and the
/// creation timestamp so two edits to the same entity never collide.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationId(pub String);

impl MutationId {
    /// Create a MutationId from an explicit string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from the target entity and a timestamp (Unix ms).
    pub fn derive(target: &str, created_at: i64) -> Self {
        Self(format!("{}-{}", target, created_at))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutationId({})", self.0)
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MutationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an entity inside an entity context (patient id, etc.).
///
/// Assigned by the context on create; opaque to the queue.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an EntityId from an explicit string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The resource kinds the clinic exposes.
///
/// Dispatch into entity contexts is explicit by kind; there is no
/// capability probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Patient,
    Appointment,
    MedicalRecord,
}

impl EntityKind {
    /// Remote base path for this resource kind.
    pub fn base_endpoint(&self) -> &'static str {
        match self {
            EntityKind::Patient => "/patients",
            EntityKind::Appointment => "/appointments",
            EntityKind::MedicalRecord => "/records",
        }
    }

    /// Endpoint for one item of this kind.
    pub fn item_endpoint(&self, id: &EntityId) -> String {
        format!("{}/{}", self.base_endpoint(), id)
    }

    /// All kinds, in registry order.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Patient,
        EntityKind::Appointment,
        EntityKind::MedicalRecord,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Patient => "patient",
            EntityKind::Appointment => "appointment",
            EntityKind::MedicalRecord => "medical_record",
        };
        write!(f, "{}", s)
    }
}

/// What a mutation does to its target; maps to the transport verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// HTTP method used by the default transport.
    pub fn verb(&self) -> &'static str {
        match self {
            MutationKind::Create => "POST",
            MutationKind::Update => "PUT",
            MutationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_id_derive() {
        let id = MutationId::derive("patient-42", 1700000000000);
        assert_eq!(id.as_str(), "patient-42-1700000000000");
    }

    #[test]
    fn test_item_endpoint() {
        let id = EntityId::new("42");
        assert_eq!(EntityKind::Patient.item_endpoint(&id), "/patients/42");
        assert_eq!(EntityKind::MedicalRecord.item_endpoint(&id), "/records/42");
    }

    #[test]
    fn test_all_kinds_have_distinct_endpoints() {
        let endpoints: std::collections::HashSet<_> =
            EntityKind::ALL.iter().map(|k| k.base_endpoint()).collect();
        assert_eq!(endpoints.len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_kind_serde_tags() {
        let json = serde_json::to_string(&MutationKind::Update).unwrap();
        assert_eq!(json, "\"UPDATE\"");
        let kind: EntityKind = serde_json::from_str("\"medical_record\"").unwrap();
        assert_eq!(kind, EntityKind::MedicalRecord);
    }
}
