//! SQLite implementation of the DurableStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite behind a mutex; the whole queue snapshot is one JSON value under
//! a fixed key, so every save is a single upsert.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use caresync_core::{snapshot, MutationRecord, SNAPSHOT_KEY};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::DurableStore;

/// Fixed key under which the auth credential is stored.
pub const CREDENTIAL_KEY: &str = "auth_credential";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Operations are short single-statement
/// upserts and lookups, cheap enough to run on the async runtime directly.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute an operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
        f(&conn)
    }

    fn put_kv(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, caresync_core::now_millis()],
            )?;
            Ok(())
        })
    }

    fn get_kv(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn save_snapshot(&self, records: &[MutationRecord]) -> Result<()> {
        let encoded = snapshot::encode(records)?;
        self.put_kv(SNAPSHOT_KEY, &encoded)?;
        tracing::debug!(pending = records.len(), "queue snapshot persisted");
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Vec<MutationRecord>> {
        let raw = self.get_kv(SNAPSHOT_KEY)?;
        Ok(snapshot::decode_or_empty(raw.as_deref())?)
    }

    async fn put_credential(&self, token: &str) -> Result<()> {
        self.put_kv(CREDENTIAL_KEY, token)
    }

    async fn get_credential(&self) -> Result<Option<String>> {
        self.get_kv(CREDENTIAL_KEY)
    }
}
