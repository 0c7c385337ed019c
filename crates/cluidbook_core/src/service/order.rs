//! Merge and ordering engine.
//!
//! # Responsibility
//! - Reconcile freshly listed records with the previous display order.
//!
//! # Invariants
//! - Output holds every input record exactly once.
//! - Ids from the previous order keep their relative position.
//! - Ids missing from the store are dropped from the order.
//! - Newcomers follow, most recently edited first (ties by id ascending).

use crate::model::record::Record;
use std::collections::HashMap;

/// Orders `records` by `previous_order`, then appends unseen records by recency.
pub fn reconcile(records: Vec<Record>, previous_order: &[String]) -> Vec<Record> {
    let mut by_id: HashMap<String, Record> = records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    for id in previous_order {
        if let Some(record) = by_id.remove(id) {
            ordered.push(record);
        }
    }

    let mut newcomers: Vec<Record> = by_id.into_values().collect();
    newcomers.sort_by(|a, b| {
        b.last_edited
            .cmp(&a.last_edited)
            .then_with(|| a.id.cmp(&b.id))
    });
    ordered.extend(newcomers);
    ordered
}

/// In-memory display order of record ids.
///
/// Volatile: it starts empty and is rebuilt by every reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayOrder {
    ids: Vec<String>,
}

impl DisplayOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    /// Replaces the order wholesale, e.g. with a just-imported batch.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = String>) {
        self.ids = ids.into_iter().collect();
    }

    /// Drops `id` ahead of the next reconciliation.
    pub fn remove(&mut self, id: &str) {
        self.ids.retain(|candidate| candidate != id);
    }

    /// Reconciles `records` against this order and adopts the result.
    pub fn reconcile(&mut self, records: Vec<Record>) -> Vec<Record> {
        let ordered = reconcile(records, &self.ids);
        self.ids = ordered.iter().map(|record| record.id.clone()).collect();
        ordered
    }

    /// Moves the id at `from` to index `to`, shifting the rest.
    pub(crate) fn move_index(&mut self, from: usize, to: usize) {
        let id = self.ids.remove(from);
        let to = to.min(self.ids.len());
        self.ids.insert(to, id);
    }
}
