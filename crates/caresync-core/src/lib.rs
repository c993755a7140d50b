//! # Caresync Core
//!
//! Core primitives for the Caresync mutation-synchronization kernel:
//! mutation records, entity/mutation kinds, and the queue snapshot
//! encoding.
//!
//! ## Key Types
//!
//! - [`MutationRecord`] - One durable unit of pending work
//! - [`MutationId`] / [`EntityId`] - Newtyped identifiers
//! - [`EntityKind`] - Patient / Appointment / MedicalRecord dispatch tag
//! - [`MutationKind`] - Create / Update / Delete
//!
//! ## Snapshot
//!
//! The whole queue serializes as one JSON array under a fixed key; see
//! [`snapshot`].

pub mod record;
pub mod snapshot;
pub mod types;

pub use record::{now_millis, MutationRecord, MutationRecordBuilder};
pub use snapshot::{SnapshotError, SNAPSHOT_KEY};
pub use types::{EntityId, EntityKind, MutationId, MutationKind};
