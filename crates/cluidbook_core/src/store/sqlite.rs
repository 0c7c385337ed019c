//! SQLite-backed key-value store.
//!
//! # Responsibility
//! - Persist JSON values as text rows in `kv_entries`.
//!
//! # Invariants
//! - Each `read`/`write` holds the connection lock for one statement only;
//!   no lock is held across an await point.

use super::{KeyValueStore, KvError, KvResult};
use crate::db::{open_db, open_db_in_memory, DbResult};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Production key-value store over one migrated SQLite connection.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KvError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn read(&self, key: &str) -> KvResult<Option<Value>> {
        let text: Option<String> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?
        };

        debug!(
            "event=kv_read module=store status=ok key={} hit={}",
            key,
            text.is_some()
        );
        text.map(|text| {
            serde_json::from_str(&text).map_err(|source| KvError::InvalidJson {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn write(&self, key: &str, value: Value) -> KvResult<()> {
        let text = value.to_string();
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;",
                params![key, text],
            )?;
        }

        debug!(
            "event=kv_write module=store status=ok key={} bytes={}",
            key,
            text.len()
        );
        Ok(())
    }
}
