//! # Caresync Testkit
//!
//! Testing utilities for Caresync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Helper structs wiring a memory store, scripted
//!   transport and connectivity monitor into a ready-made queue
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust,ignore
//! use caresync_testkit::fixtures::{patient_create, TestFixture};
//!
//! let fixture = TestFixture::offline();
//! let submission = fixture.queue.enqueue(patient_create(1)).await;
//! fixture.monitor.set_online();
//! submission.synced().await.unwrap();
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use caresync_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn derived_id_is_deterministic(params: RecordParams) {
//!         let r1 = record_from_params(&params);
//!         let r2 = record_from_params(&params);
//!         prop_assert_eq!(r1.id, r2.id);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{fast_config, patient_create, patient_delete, patient_update, TestFixture};
pub use generators::{record_from_params, RecordParams};
