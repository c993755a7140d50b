//! Entity contexts: the per-resource in-memory state containers the
//! optimistic step delegates to.
//!
//! The engine dispatches into a context by explicit [`EntityKind`], one
//! registered context per kind. Contexts own their collections exclusively;
//! the queue never reads or writes entity state, it only carries opaque
//! payloads to the transport.

use std::collections::HashMap;
use std::sync::Mutex;

use caresync_core::EntityId;
use serde_json::Value;
use thiserror::Error;

/// Errors from an optimistic local apply.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The target entity does not exist locally.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// The patch cannot be applied to the local entity.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// One resource kind's local state container.
///
/// All methods are synchronous: the optimistic apply must complete before
/// the façade call returns control, so the UI reflects the change
/// immediately. Each is invoked at most once per façade call; optimistic
/// state is a one-shot side effect, never replayed from the durable queue.
pub trait EntityContext: Send + Sync {
    /// Insert a new entity and return its locally assigned id.
    fn apply_create(&self, payload: &Value) -> Result<EntityId>;

    /// Patch an existing entity in place.
    fn apply_update(&self, id: &EntityId, patch: &Value) -> Result<()>;

    /// Remove an entity.
    fn apply_delete(&self, id: &EntityId) -> Result<()>;

    /// Undo an optimistic change whose remote sync permanently failed.
    ///
    /// `prior` is the snapshot captured before the change: restoring it
    /// undoes an update or a delete. `None` means the change was a create,
    /// undone by removing the entity again.
    fn apply_rollback(&self, id: &EntityId, prior: Option<&Value>) -> Result<()>;
}

/// In-memory entity context holding JSON documents.
///
/// The reference implementation, also used throughout the tests. Patches
/// are shallow object merges, matching what the clinic's forms submit.
pub struct MemoryContext {
    prefix: String,
    inner: Mutex<MemoryContextInner>,
}

#[derive(Default)]
struct MemoryContextInner {
    entities: HashMap<EntityId, Value>,
    next_id: u64,
}

impl MemoryContext {
    /// Create a context whose assigned ids start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Mutex::new(MemoryContextInner::default()),
        }
    }

    /// Fetch a local entity by id.
    pub fn get(&self, id: &EntityId) -> Option<Value> {
        self.inner.lock().unwrap().entities.get(id).cloned()
    }

    /// Number of local entities.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entities.len()
    }

    /// Whether the context holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityContext for MemoryContext {
    fn apply_create(&self, payload: &Value) -> Result<EntityId> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = EntityId::new(format!("{}-{}", self.prefix, inner.next_id));
        inner.entities.insert(id.clone(), payload.clone());
        Ok(id)
    }

    fn apply_update(&self, id: &EntityId, patch: &Value) -> Result<()> {
        let patch_obj = patch
            .as_object()
            .ok_or_else(|| ContextError::InvalidPatch("patch must be a JSON object".into()))?;

        let mut inner = self.inner.lock().unwrap();
        let entity = inner
            .entities
            .get_mut(id)
            .ok_or_else(|| ContextError::NotFound(id.clone()))?;

        match entity.as_object_mut() {
            Some(fields) => {
                for (key, value) in patch_obj {
                    fields.insert(key.clone(), value.clone());
                }
            }
            None => *entity = patch.clone(),
        }
        Ok(())
    }

    fn apply_delete(&self, id: &EntityId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entities
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ContextError::NotFound(id.clone()))
    }

    fn apply_rollback(&self, id: &EntityId, prior: Option<&Value>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match prior {
            Some(state) => {
                inner.entities.insert(id.clone(), state.clone());
            }
            None => {
                inner.entities.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_assigns_sequential_ids() {
        let ctx = MemoryContext::new("patient");
        let a = ctx.apply_create(&json!({"firstName": "Jean"})).unwrap();
        let b = ctx.apply_create(&json!({"firstName": "Ana"})).unwrap();
        assert_eq!(a.as_str(), "patient-1");
        assert_eq!(b.as_str(), "patient-2");
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_update_is_shallow_merge() {
        let ctx = MemoryContext::new("patient");
        let id = ctx
            .apply_create(&json!({"firstName": "Jean", "lastName": "Dupont"}))
            .unwrap();

        ctx.apply_update(&id, &json!({"firstName": "Jeanne"})).unwrap();
        assert_eq!(
            ctx.get(&id).unwrap(),
            json!({"firstName": "Jeanne", "lastName": "Dupont"})
        );
    }

    #[test]
    fn test_update_missing_entity_fails() {
        let ctx = MemoryContext::new("patient");
        let err = ctx
            .apply_update(&EntityId::new("patient-99"), &json!({"x": 1}))
            .unwrap_err();
        assert!(matches!(err, ContextError::NotFound(_)));
    }

    #[test]
    fn test_rollback_restores_prior_state() {
        let ctx = MemoryContext::new("patient");
        let id = ctx.apply_create(&json!({"firstName": "Jean"})).unwrap();
        ctx.apply_update(&id, &json!({"firstName": "Wrong"})).unwrap();

        ctx.apply_rollback(&id, Some(&json!({"firstName": "Jean"})))
            .unwrap();
        assert_eq!(ctx.get(&id).unwrap(), json!({"firstName": "Jean"}));
    }

    #[test]
    fn test_rollback_of_create_removes_entity() {
        let ctx = MemoryContext::new("patient");
        let id = ctx.apply_create(&json!({"firstName": "Jean"})).unwrap();
        ctx.apply_rollback(&id, None).unwrap();
        assert!(ctx.get(&id).is_none());
    }
}
