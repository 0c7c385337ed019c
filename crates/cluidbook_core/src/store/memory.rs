//! In-memory key-value store with interleaving and failure hooks.
//!
//! Used by tests to reproduce the read-all/write-all race and partial batch
//! failures without a database.

use super::{KeyValueStore, KvError, KvResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Value>,
    /// When set, reads are served from this snapshot instead of `entries`.
    frozen: Option<HashMap<String, Value>>,
    unavailable: bool,
    /// Remaining successful writes before every write fails.
    writes_left: Option<usize>,
    write_count: usize,
}

/// Test double for [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryKvStore {
    state: Mutex<MemoryState>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read and write fail with `KvError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Lets `count` more writes succeed, then fails all later writes.
    pub fn fail_writes_after(&self, count: usize) {
        self.state().writes_left = Some(count);
    }

    /// Clears any write failure injection.
    pub fn clear_write_failures(&self) {
        self.state().writes_left = None;
    }

    /// Pins reads to the current contents until [`Self::thaw_reads`].
    ///
    /// Writes still land, so two read-modify-write sequences started while
    /// frozen both observe the same stale snapshot, as when two callers read
    /// before either writes.
    pub fn freeze_reads(&self) {
        let mut state = self.state();
        state.frozen = Some(state.entries.clone());
    }

    /// Serves reads from live contents again.
    pub fn thaw_reads(&self) {
        self.state().frozen = None;
    }

    /// Returns the live value under `key`, bypassing all hooks.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.state().entries.get(key).cloned()
    }

    /// Stores a raw value, bypassing all hooks.
    pub fn insert_raw(&self, key: impl Into<String>, value: Value) {
        self.state().entries.insert(key.into(), value);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.state().write_count
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn read(&self, key: &str) -> KvResult<Option<Value>> {
        let state = self.state();
        if state.unavailable {
            return Err(KvError::Unavailable("simulated outage".to_string()));
        }
        let source = state.frozen.as_ref().unwrap_or(&state.entries);
        Ok(source.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> KvResult<()> {
        let mut state = self.state();
        if state.unavailable {
            return Err(KvError::Unavailable("simulated outage".to_string()));
        }
        match state.writes_left {
            Some(0) => return Err(KvError::Unavailable("simulated write failure".to_string())),
            Some(left) => state.writes_left = Some(left - 1),
            None => {}
        }
        state.entries.insert(key.to_string(), value);
        state.write_count += 1;
        Ok(())
    }
}
