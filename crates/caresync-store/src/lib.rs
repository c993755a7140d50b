//! # Caresync Store
//!
//! Storage abstraction for the Caresync mutation queue. Provides a
//! trait-based interface for queue persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts snapshot persistence behind the
//! [`DurableStore`] trait, allowing the queue to be storage-agnostic. The
//! primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! tests and degraded (storage-disabled) operation.
//!
//! ## Key Types
//!
//! - [`DurableStore`] - The async trait for snapshot + credential storage
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use caresync_store::{DurableStore, SqliteStore};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("caresync.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     // The queue persists its snapshot after every change
//!     let pending = store.load_snapshot().await.unwrap();
//!     assert!(pending.is_empty());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Whole-snapshot writes**: every queue change rewrites the full
//!   snapshot under one fixed key
//! - **Best-effort durability**: the queue logs and continues memory-only
//!   when the store is unavailable

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, CREDENTIAL_KEY};
pub use traits::DurableStore;
