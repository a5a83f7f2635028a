//! Gloss Storage Layer
//!
//! SQLite-backed persistence for the three pieces of durable state the
//! pipeline carries between calls:
//!
//! - the **response cache** (completions and embeddings namespaces)
//! - the **identity mapper** (per-task text ↔ uid tables)
//! - the **fitted-model store** (one clustering model per task + purpose)
//!
//! # Examples
//!
//! ```no_run
//! use gloss_store::SqliteStore;
//!
//! let store = SqliteStore::open("gloss.db").unwrap();
//! let uids = store.resolve_batch("task-1", &["a".into(), "b".into()]).unwrap();
//! assert_eq!(uids.len(), 2);
//! ```
//!
//! # Thread Safety
//!
//! The connection lives behind a mutex; `SqliteStore` is `Clone` and can be
//! shared across the engines of one process. Within a batch, concurrent
//! requests write disjoint cache keys, so append-safety is the only
//! requirement (no fine-grained locking).

#![warn(missing_docs)]

mod cache;
mod identity;
mod models;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Persisted state is internally inconsistent. Fatal for the task:
    /// overwriting it could mint colliding uids across restarts.
    #[error("Corrupt persisted state: {0}")]
    Corrupt(String),

    /// Invalid data format in a stored payload
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection lock failure
    #[error("Store lock poisoned")]
    Lock,
}

/// SQLite-backed store for cache entries, identity mappings, and fitted
/// clustering models.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store, useful for testing
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }
}

/// Seconds since the Unix epoch, for row timestamps
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
