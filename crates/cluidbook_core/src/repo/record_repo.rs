//! Record store adapter over a key-value store.
//!
//! # Responsibility
//! - Expose list/get/upsert/delete over the single id → record mapping.
//! - Maintain the last active id pointer used by the observer path.
//!
//! # Invariants
//! - Exactly one record per id: the mapping is keyed by `Record::id`.
//! - `upsert` is the only mutator of a record and always advances `last_edited`.
//! - Every mutation reads the full mapping and writes it back whole. This is
//!   not atomic: two concurrent upserts that both read before either writes
//!   lose one of the writes. The adapter does not retry or lock.

use crate::config::StoreKeys;
use crate::model::record::Record;
use crate::store::{KeyValueStore, KvError};
use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

type RecordMap = BTreeMap<String, Record>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying persistence call failed.
    #[error("record store unavailable: {0}")]
    Unavailable(#[source] KvError),
    /// Persisted data cannot be decoded into records.
    #[error("invalid persisted record data: {0}")]
    InvalidData(String),
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        match value {
            KvError::InvalidJson { key, source } => {
                Self::InvalidData(format!("key `{key}`: {source}"))
            }
            other => Self::Unavailable(other),
        }
    }
}

/// Source of wall-clock time for `last_edited` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Record store adapter.
pub struct RecordStore<S: KeyValueStore> {
    kv: S,
    keys: StoreKeys,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Creates an adapter stamping records with the system clock.
    pub fn new(kv: S, keys: StoreKeys) -> Self {
        Self {
            kv,
            keys,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for `last_edited` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns all records in no particular order.
    pub async fn list(&self) -> StoreResult<Vec<Record>> {
        Ok(self.read_all().await?.into_values().collect())
    }

    /// Gets one record; a missing id is `Ok(None)`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.read_all().await?.remove(id))
    }

    /// Inserts or replaces the record at `record.id` and marks it active.
    ///
    /// Returns the record as stored, with its fresh `last_edited` stamp.
    pub async fn upsert(&self, record: Record) -> StoreResult<Record> {
        let stored = self.save(record).await?;
        self.set_last_active(&stored.id).await?;
        Ok(stored)
    }

    /// Inserts or replaces the record at `record.id` without touching the
    /// last active pointer.
    ///
    /// Once this returns `Ok` the record is persisted.
    pub async fn save(&self, mut record: Record) -> StoreResult<Record> {
        let mut records = self.read_all().await?;
        let floor = records
            .get(&record.id)
            .map(|existing| existing.last_edited.max(record.last_edited))
            .unwrap_or(record.last_edited);
        record.last_edited = next_stamp(self.clock.now(), floor);

        records.insert(record.id.clone(), record.clone());
        self.write_all(&records).await?;

        info!(
            "event=record_upsert module=repo status=ok id={} total={}",
            record.id,
            records.len()
        );
        Ok(record)
    }

    /// Removes the record at `id`; absent ids are a no-op.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut records = self.read_all().await?;
        if records.remove(id).is_none() {
            return Ok(());
        }
        self.write_all(&records).await?;

        info!(
            "event=record_delete module=repo status=ok id={} total={}",
            id,
            records.len()
        );
        Ok(())
    }

    /// Points the observer path at `id`.
    pub async fn set_last_active(&self, id: &str) -> StoreResult<()> {
        self.kv
            .write(&self.keys.last_active, Value::String(id.to_string()))
            .await
            .map_err(|err| self.log_failure("set_last_active", err))
    }

    /// Returns the last active id, `None` when unset or not a string.
    pub async fn last_active(&self) -> StoreResult<Option<String>> {
        let value = self
            .kv
            .read(&self.keys.last_active)
            .await
            .map_err(|err| self.log_failure("last_active", err))?;
        Ok(value.and_then(|value| value.as_str().map(str::to_string)))
    }

    async fn read_all(&self) -> StoreResult<RecordMap> {
        let value = self
            .kv
            .read(&self.keys.records)
            .await
            .map_err(|err| self.log_failure("read_all", err))?;

        match value {
            None | Some(Value::Null) => Ok(RecordMap::new()),
            Some(value) => serde_json::from_value(value).map_err(|err| {
                error!(
                    "event=record_read module=repo status=error error_code=invalid_data key={}",
                    self.keys.records
                );
                StoreError::InvalidData(err.to_string())
            }),
        }
    }

    async fn write_all(&self, records: &RecordMap) -> StoreResult<()> {
        let value = serde_json::to_value(records)
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        self.kv
            .write(&self.keys.records, value)
            .await
            .map_err(|err| self.log_failure("write_all", err))
    }

    fn log_failure(&self, op: &'static str, err: KvError) -> StoreError {
        error!("event=record_store module=repo status=error op={op} error={err}");
        StoreError::from(err)
    }
}

/// Returns `now` unless it does not advance past `floor`.
fn next_stamp(now: DateTime<Utc>, floor: DateTime<Utc>) -> DateTime<Utc> {
    if now > floor {
        now
    } else {
        floor + Duration::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::next_stamp;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn next_stamp_prefers_clock_when_it_advances() {
        let floor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = floor + Duration::seconds(5);
        assert_eq!(next_stamp(now, floor), now);
    }

    #[test]
    fn next_stamp_bumps_when_clock_stalls_or_regresses() {
        let floor = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(next_stamp(floor, floor), floor + Duration::milliseconds(1));
        assert_eq!(
            next_stamp(floor - Duration::hours(1), floor),
            floor + Duration::milliseconds(1)
        );
    }
}
