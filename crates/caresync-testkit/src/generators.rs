//! Proptest generators for property-based testing.

use proptest::prelude::*;

use caresync_core::{EntityId, EntityKind, MutationId, MutationKind, MutationRecord};
use serde_json::{json, Value};

/// Generate an entity kind.
pub fn entity_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Patient),
        Just(EntityKind::Appointment),
        Just(EntityKind::MedicalRecord),
    ]
}

/// Generate a mutation kind.
pub fn mutation_kind() -> impl Strategy<Value = MutationKind> {
    prop_oneof![
        Just(MutationKind::Create),
        Just(MutationKind::Update),
        Just(MutationKind::Delete),
    ]
}

/// Generate an entity id.
pub fn entity_id() -> impl Strategy<Value = EntityId> {
    "[a-z]{3,10}-[0-9]{1,5}".prop_map(EntityId::new)
}

/// Generate a reasonable creation timestamp (Unix ms).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Generate a flat JSON object payload.
pub fn payload() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-zA-Z]{1,12}", "[ -~]{0,24}", 0..6)
        .prop_map(|fields| json!(fields))
}

/// Parameters for generating a mutation record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub entity: EntityKind,
    pub kind: MutationKind,
    pub target: Option<EntityId>,
    pub payload: Value,
    pub prior_state: Option<Value>,
    pub created_at: i64,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            entity_kind(),
            mutation_kind(),
            prop::option::of(entity_id()),
            payload(),
            prop::option::of(payload()),
            timestamp(),
        )
            .prop_map(
                |(entity, kind, target, payload, prior_state, created_at)| RecordParams {
                    entity,
                    kind,
                    target,
                    payload,
                    prior_state,
                    created_at,
                },
            )
            .boxed()
    }
}

/// Generate a record from parameters.
pub fn record_from_params(params: &RecordParams) -> MutationRecord {
    let mut builder = MutationRecord::builder(params.entity, params.kind)
        .payload(params.payload.clone())
        .prior_state(params.prior_state.clone())
        .created_at(params.created_at);

    if let Some(target) = &params.target {
        builder = builder
            .target(target.clone())
            .endpoint(params.entity.item_endpoint(target));
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use caresync_core::snapshot;

    proptest! {
        #[test]
        fn test_derived_id_is_deterministic(params: RecordParams) {
            let r1 = record_from_params(&params);
            let r2 = record_from_params(&params);
            prop_assert_eq!(r1.id, r2.id);
        }

        #[test]
        fn test_snapshot_preserves_order_and_content(
            all_params in prop::collection::vec(any::<RecordParams>(), 0..8),
        ) {
            let records: Vec<MutationRecord> =
                all_params.iter().map(record_from_params).collect();

            let encoded = snapshot::encode(&records).unwrap();
            let decoded = snapshot::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, records);
        }

        #[test]
        fn test_edits_to_same_entity_get_distinct_ids(
            target in entity_id(),
            t1 in timestamp(),
            t2 in timestamp(),
        ) {
            prop_assume!(t1 != t2);
            let a = MutationId::derive(target.as_str(), t1);
            let b = MutationId::derive(target.as_str(), t2);
            prop_assert_ne!(a, b);
        }
    }
}
