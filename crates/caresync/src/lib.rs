//! # Caresync
//!
//! The unified API for offline-tolerant clinic data sync - optimistic
//! local mutations backed by a durable, ordered command queue.
//!
//! ## Overview
//!
//! Caresync lets a clinic application keep working through connectivity
//! loss:
//!
//! - **Optimistic apply**: every create/update/delete lands in local
//!   state before any network activity
//! - **Durable queue**: the pending command list survives restarts,
//!   persisted after every change
//! - **Ordered drain**: commands are sent strictly FIFO once a
//!   connection is available, with exponential backoff on transient
//!   failures
//! - **Rollback**: a command that permanently fails undoes its
//!   optimistic change, so local and remote state converge
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caresync::{ConnectivityMonitor, EngineConfig, MutateOptions, SyncEngine};
//! use caresync::context::MemoryContext;
//! use caresync::core::EntityKind;
//! use caresync::queue::HttpTransport;
//! use caresync::store::SqliteStore;
//! use serde_json::json;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("clinic.db").unwrap());
//!     let transport = HttpTransport::new("https://api.example.com", Arc::clone(&store));
//!     let monitor = ConnectivityMonitor::new(true);
//!
//!     let engine = SyncEngine::new(store, transport, monitor, EngineConfig::default());
//!     engine.register_context(EntityKind::Patient, Arc::new(MemoryContext::new("patient")));
//!     engine.recover().await.unwrap();
//!
//!     let (id, submission) = engine
//!         .create(
//!             EntityKind::Patient,
//!             json!({"firstName": "Jean"}),
//!             MutateOptions::default(),
//!         )
//!         .await
//!         .unwrap();
//!     println!("created {id}, remote ack: {:?}", submission.synced().await);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `caresync::core` - Core types (MutationRecord, EntityKind, etc.)
//! - `caresync::store` - Durable storage abstraction and SQLite
//! - `caresync::queue` - Mutation queue, transports, connectivity

pub mod context;
pub mod engine;
pub mod error;

// Re-export component crates
pub use caresync_core as core;
pub use caresync_queue as queue;
pub use caresync_store as store;

// Re-export main types for convenience
pub use context::{ContextError, EntityContext, MemoryContext};
pub use engine::{EngineConfig, MutateOptions, SyncEngine};
pub use error::{EngineError, Result};

// Re-export commonly used component types
pub use caresync_core::{EntityId, EntityKind, MutationId, MutationKind, MutationRecord};
pub use caresync_queue::{
    ConnectivityMonitor, PermanentFailure, QueueConfig, Submission, TransportError,
};
pub use caresync_store::{DurableStore, MemoryStore, SqliteStore};
