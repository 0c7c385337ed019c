//! Key-value persistence seam.
//!
//! # Responsibility
//! - Define the `KeyValueStore` capability the record store is built on.
//! - Provide the SQLite-backed production store and an in-memory test double.
//!
//! # Invariants
//! - Stores expose whole-value `read`/`write` only; there are no transactions.
//! - A `read` followed by a `write` is never atomic across callers.

use crate::db::DbError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

pub type KvResult<T> = Result<T, KvError>;

/// Failure of one key-value call.
#[derive(Debug, Error)]
pub enum KvError {
    /// Backend cannot be reached (lock poisoned, injected outage, ...).
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    /// Underlying SQLite failure.
    #[error("{0}")]
    Db(#[from] DbError),
    /// Stored text for `key` is not valid JSON.
    #[error("invalid JSON stored under `{key}`: {source}")]
    InvalidJson {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent key-value capability storing JSON values under string keys.
///
/// Every call is a suspension point; callers must assume other writers may
/// run between any two calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, `None` when absent.
    async fn read(&self, key: &str) -> KvResult<Option<Value>>;
    /// Replaces the value stored under `key`.
    async fn write(&self, key: &str, value: Value) -> KvResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn read(&self, key: &str) -> KvResult<Option<Value>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: Value) -> KvResult<()> {
        (**self).write(key, value).await
    }
}
