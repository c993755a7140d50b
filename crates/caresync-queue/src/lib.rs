//! # Caresync Queue
//!
//! The offline-tolerant mutation queue: durable, ordered, at-least-once
//! delivery of pending commands to a remote service.
//!
//! ## Overview
//!
//! The queue lets the UI apply state changes instantly while a background
//! drain loop reconciles each change with the remote service, surviving
//! network loss, process restarts, and partial failures.
//!
//! ## Key Properties
//!
//! - **FIFO**: all mutations drain in enqueue order, across resources
//! - **Durable**: the snapshot is rewritten after every queue change
//! - **Bounded retry**: exponential backoff up to a fixed attempt cap
//! - **Fail fast**: non-retryable errors consume a single attempt
//! - **Offline-aware**: the loop parks while offline and resumes on the
//!   connectivity monitor's next online transition
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caresync_queue::{ConnectivityMonitor, HttpTransport, MutationQueue, QueueConfig};
//! use caresync_store::SqliteStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("caresync.db").unwrap());
//!     let transport = HttpTransport::new("https://api.clinic.example", Arc::clone(&store));
//!     let connectivity = ConnectivityMonitor::new(true);
//!
//!     let queue = MutationQueue::new(store, transport, connectivity, QueueConfig::default());
//!     let recovered = queue.recover().await.unwrap();
//!     println!("{} mutations pending from last run", recovered);
//! }
//! ```

pub mod connectivity;
pub mod error;
pub mod http;
pub mod queue;
pub mod transport;

pub use connectivity::ConnectivityMonitor;
pub use error::{QueueError, Result, TransportError};
pub use http::HttpTransport;
pub use queue::{MutationQueue, PermanentFailure, QueueConfig, Submission};
pub use transport::{memory::ScriptedTransport, Transport};
