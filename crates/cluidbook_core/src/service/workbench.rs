//! Workbench use-case service.
//!
//! # Responsibility
//! - Orchestrate import, capture, note editing, deletion and reordering over
//!   the record store.
//! - Own the volatile display order, drag state and note drafts.
//! - Report every operation as a short status message.
//!
//! # Invariants
//! - Blank import text and text without entries never touch the store.
//! - A store failure aborts the remaining import entries; entries written
//!   before it stay written.
//! - After an import the imported ids lead the display order, in input order.
//! - Import never overwrites an existing note with nothing and never touches
//!   captured fields or observer tags.

use crate::document::{DocumentError, DocumentFields};
use crate::import::parser::{parse_import_entries, ImportEntry};
use crate::model::record::{identifier_from_fields, Record};
use crate::repo::record_repo::{RecordStore, StoreError};
use crate::service::order::{reconcile, DisplayOrder};
use crate::service::reorder::{DropOutcome, ReorderController};
use crate::store::KeyValueStore;
use log::{info, warn};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import text is empty")]
    EmptyInput,
    #[error("import text contains no entries")]
    NoValidEntries,
    #[error("import stopped after {applied} of {total} entries: {source}")]
    Store {
        applied: usize,
        total: usize,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    fn status_text(&self) -> String {
        match self {
            Self::EmptyInput => "Provide at least one cluid to import.".to_string(),
            Self::NoValidEntries => "No valid cluids found in the input.".to_string(),
            Self::Store { applied: 0, .. } => "Failed to import cluids.".to_string(),
            Self::Store { applied, total, .. } => {
                format!("Failed to import cluids: stored {applied} of {total} before the error.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("captured fields carry no cluid and none was supplied")]
    MissingIdentifier,
    #[error("record not found: {0}")]
    UnknownRecord(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Short user-facing outcome of the last operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Summary of a completed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub ids: Vec<String>,
}

/// Record workbench over one record store.
pub struct Workbench<S: KeyValueStore> {
    store: RecordStore<S>,
    records: Vec<Record>,
    order: DisplayOrder,
    reorder: ReorderController,
    note_drafts: HashMap<String, String>,
    status: Option<StatusMessage>,
}

impl<S: KeyValueStore> Workbench<S> {
    pub fn new(store: RecordStore<S>) -> Self {
        Self {
            store,
            records: Vec::new(),
            order: DisplayOrder::new(),
            reorder: ReorderController::new(),
            note_drafts: HashMap::new(),
            status: None,
        }
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Records in display order as of the last refresh or move.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn order(&self) -> &DisplayOrder {
        &self.order
    }

    pub fn reorder(&self) -> &ReorderController {
        &self.reorder
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn note_draft(&self, id: &str) -> Option<&str> {
        self.note_drafts.get(id).map(String::as_str)
    }

    /// Re-reads the store and reconciles it with the display order.
    pub async fn refresh(&mut self) -> Result<&[Record], StoreError> {
        let listed = self.store.list().await?;
        self.records = self.order.reconcile(listed);
        Ok(&self.records)
    }

    /// Parses `raw` and upserts every entry, then puts the batch first.
    pub async fn import_text(&mut self, raw: &str) -> Result<ImportSummary, ImportError> {
        let result = self.run_import(raw).await;
        self.status = Some(match &result {
            Ok(summary) => StatusMessage::info(format!("Imported {} cluid(s).", summary.imported)),
            Err(err) => StatusMessage::error(err.status_text()),
        });
        result
    }

    async fn run_import(&mut self, raw: &str) -> Result<ImportSummary, ImportError> {
        if raw.trim().is_empty() {
            return Err(ImportError::EmptyInput);
        }
        let entries = parse_import_entries(raw);
        if entries.is_empty() {
            return Err(ImportError::NoValidEntries);
        }

        let total = entries.len();
        let mut applied = 0;
        for entry in &entries {
            if let Err(source) = self.import_entry(entry, &mut applied).await {
                warn!(
                    "event=import module=service status=error applied={applied} total={total} error={source}"
                );
                if let Err(err) = self.refresh().await {
                    warn!("event=import_refresh module=service status=error error={err}");
                }
                return Err(ImportError::Store {
                    applied,
                    total,
                    source,
                });
            }
        }

        let ids: Vec<String> = entries.into_iter().map(|entry| entry.id).collect();
        self.order.replace(ids.iter().cloned());
        self.refresh()
            .await
            .map_err(|source| ImportError::Store {
                applied: total,
                total,
                source,
            })?;

        info!("event=import module=service status=ok total={total}");
        Ok(ImportSummary {
            imported: total,
            ids,
        })
    }

    /// Stores one entry and marks it active; `applied` counts it as soon as
    /// the record itself is persisted.
    async fn import_entry(
        &self,
        entry: &ImportEntry,
        applied: &mut usize,
    ) -> Result<(), StoreError> {
        let mut record = self
            .store
            .get(&entry.id)
            .await?
            .unwrap_or_else(|| Record::new(entry.id.as_str()));
        if let Some(note) = &entry.note {
            record.note = note.clone();
        }
        record.seed_identifier_field();
        let stored = self.store.save(record).await?;
        *applied += 1;
        self.store.set_last_active(&stored.id).await
    }

    /// Saves the document's current fields under its cluid (or `fallback_id`).
    ///
    /// Keeps the stored note and observer tags of an existing record.
    pub async fn capture_current<D: DocumentFields + ?Sized>(
        &mut self,
        document: &D,
        fallback_id: Option<&str>,
    ) -> Result<Record, WorkbenchError> {
        let result = self.run_capture(document, fallback_id).await;
        self.status = Some(match &result {
            Ok(record) => StatusMessage::info(format!("Saved data for {}.", record.id)),
            Err(WorkbenchError::MissingIdentifier) => {
                StatusMessage::error("Cluid is required to store a record.")
            }
            Err(_) => StatusMessage::error("Failed to save current form."),
        });
        result
    }

    async fn run_capture<D: DocumentFields + ?Sized>(
        &mut self,
        document: &D,
        fallback_id: Option<&str>,
    ) -> Result<Record, WorkbenchError> {
        let fields = document.collect_fields().await?;
        let id = identifier_from_fields(&fields)
            .or_else(|| {
                fallback_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            })
            .ok_or(WorkbenchError::MissingIdentifier)?;

        let mut record = self
            .store
            .get(&id)
            .await?
            .unwrap_or_else(|| Record::new(id.as_str()));
        record.fields = fields;
        let stored = self.store.upsert(record).await?;
        self.refresh().await?;
        Ok(stored)
    }

    /// Pushes a record's fields into the document and marks it active.
    pub async fn fill_record<D: DocumentFields + ?Sized>(
        &mut self,
        document: &D,
        id: &str,
    ) -> Result<(), WorkbenchError> {
        let result = self.run_fill(document, id).await;
        self.status = Some(match &result {
            Ok(()) => StatusMessage::info(format!("Loaded full form data for {id} to the page.")),
            Err(_) => StatusMessage::error("Could not load data into the page."),
        });
        result
    }

    async fn run_fill<D: DocumentFields + ?Sized>(
        &mut self,
        document: &D,
        id: &str,
    ) -> Result<(), WorkbenchError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WorkbenchError::UnknownRecord(id.to_string()))?;
        document.fill_fields(&record.fields).await?;
        self.store.set_last_active(id).await?;
        Ok(())
    }

    /// Starts editing a note, seeding the draft with the displayed note.
    pub fn begin_note_edit(&mut self, id: &str) {
        let current = self
            .records
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.note.clone())
            .unwrap_or_default();
        self.note_drafts.insert(id.to_string(), current);
    }

    pub fn update_note_draft(&mut self, id: &str, text: impl Into<String>) {
        self.note_drafts.insert(id.to_string(), text.into());
    }

    pub fn cancel_note_edit(&mut self, id: &str) {
        self.note_drafts.remove(id);
    }

    /// Stores the trimmed draft as the record's note.
    pub async fn save_note(&mut self, id: &str) -> Result<Record, WorkbenchError> {
        let result = self.run_save_note(id).await;
        self.status = Some(match &result {
            Ok(_) => StatusMessage::info(format!("Updated note for {id}.")),
            Err(_) => StatusMessage::error(format!("Failed to update note for {id}.")),
        });
        result
    }

    async fn run_save_note(&mut self, id: &str) -> Result<Record, WorkbenchError> {
        let draft = self.note_drafts.get(id).cloned().unwrap_or_default();
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WorkbenchError::UnknownRecord(id.to_string()))?;
        record.note = draft.trim().to_string();
        let stored = self.store.upsert(record).await?;
        self.note_drafts.remove(id);
        self.refresh().await?;
        Ok(stored)
    }

    /// Deletes a record and prunes it from the order and drafts.
    pub async fn delete_record(&mut self, id: &str) -> Result<(), WorkbenchError> {
        let result = self.run_delete(id).await;
        self.status = Some(match &result {
            Ok(()) => StatusMessage::info(format!("Deleted {id}.")),
            Err(_) => StatusMessage::error(format!("Failed to delete {id}.")),
        });
        result
    }

    async fn run_delete(&mut self, id: &str) -> Result<(), WorkbenchError> {
        self.store.delete(id).await?;
        self.order.remove(id);
        self.note_drafts.remove(id);
        self.refresh().await?;
        Ok(())
    }

    pub fn begin_drag(&mut self, id: &str) {
        self.reorder.begin_drag(id);
    }

    /// Drops the dragged record onto `target_id` and re-sorts the list.
    pub fn drop_on(&mut self, target_id: &str) -> DropOutcome {
        let outcome = self.reorder.drop_on(&mut self.order, target_id);
        if let DropOutcome::Moved { .. } = outcome {
            let records = std::mem::take(&mut self.records);
            self.records = reconcile(records, self.order.ids());
        }
        outcome
    }

    pub fn end_drag(&mut self) {
        self.reorder.end_drag();
    }
}
