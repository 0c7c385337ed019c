use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use cluidbook_core::{
    Clock, DocumentError, DocumentFields, DropOutcome, FieldMap, ImportError, MemoryKvStore,
    Record, RecordStore, StatusKind, StoreError, StoreKeys, Workbench, WorkbenchError,
};
use std::sync::{Arc, Mutex};

const X: &str = "8016-01-02-03.04.05.6";
const Y: &str = "9015-10-11-12.13.14.7";
const Z: &str = "7001-02-03-04.05.06.78";

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

struct Harness {
    kv: Arc<MemoryKvStore>,
    clock: Arc<ManualClock>,
    bench: Workbench<Arc<MemoryKvStore>>,
}

fn harness() -> Harness {
    let kv = Arc::new(MemoryKvStore::new());
    let clock = Arc::new(ManualClock {
        now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
    });
    let store = RecordStore::new(kv.clone(), StoreKeys::default()).with_clock(clock.clone());
    Harness {
        kv,
        clock,
        bench: Workbench::new(store),
    }
}

fn displayed(bench: &Workbench<Arc<MemoryKvStore>>) -> Vec<&str> {
    bench.records().iter().map(|record| record.id.as_str()).collect()
}

#[derive(Default)]
struct FakeDocument {
    fields: Mutex<FieldMap>,
    filled: Mutex<Option<FieldMap>>,
    broken: bool,
}

impl FakeDocument {
    fn with_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: Mutex::new(
                fields
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentFields for FakeDocument {
    async fn collect_fields(&self) -> Result<FieldMap, DocumentError> {
        if self.broken {
            return Err(DocumentError("no active tab".to_string()));
        }
        Ok(self.fields.lock().unwrap().clone())
    }

    async fn fill_fields(&self, fields: &FieldMap) -> Result<(), DocumentError> {
        if self.broken {
            return Err(DocumentError("no active tab".to_string()));
        }
        *self.filled.lock().unwrap() = Some(fields.clone());
        Ok(())
    }
}

#[tokio::test]
async fn imported_batch_precedes_existing_records() {
    let mut h = harness();
    h.bench.store().upsert(Record::new(X)).await.unwrap();
    h.bench.refresh().await.unwrap();
    assert_eq!(displayed(&h.bench), vec![X]);

    h.clock.advance(Duration::minutes(1));
    let summary = h.bench.import_text(&format!("{Y} Jane Doe")).await.unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(displayed(&h.bench), vec![Y, X]);
    assert_eq!(h.bench.order().ids(), [Y.to_string(), X.to_string()].as_slice());
    let status = h.bench.status().unwrap();
    assert_eq!(status.kind, StatusKind::Info);
    assert_eq!(status.message, "Imported 1 cluid(s).");
}

#[tokio::test]
async fn import_keeps_input_order_for_batch_even_when_ids_existed() {
    let mut h = harness();
    h.bench.store().upsert(Record::new(Z)).await.unwrap();
    h.clock.advance(Duration::minutes(1));
    h.bench.store().upsert(Record::new(X)).await.unwrap();
    h.bench.refresh().await.unwrap();
    assert_eq!(displayed(&h.bench), vec![X, Z]);

    h.bench.import_text(&format!("{Z}; {Y}")).await.unwrap();
    assert_eq!(displayed(&h.bench), vec![Z, Y, X]);
}

#[tokio::test]
async fn blank_import_is_rejected_without_touching_store() {
    let mut h = harness();
    let err = h.bench.import_text("   \n\t ").await.unwrap_err();

    assert!(matches!(err, ImportError::EmptyInput));
    assert_eq!(h.kv.write_count(), 0);
    assert!(h.bench.status().unwrap().is_error());
}

#[tokio::test]
async fn import_preserves_existing_note_fields_and_tags_unless_note_given() {
    let mut h = harness();
    let mut existing = Record::new(X);
    existing.note = "Keep me".to_string();
    existing.fields.insert("product".to_string(), "Loan".to_string());
    existing.derived_state = Some("OPEN".to_string());
    h.bench.store().upsert(existing).await.unwrap();

    h.bench.import_text(X).await.unwrap();
    let bare = h.bench.store().get(X).await.unwrap().unwrap();
    assert_eq!(bare.note, "Keep me");
    assert_eq!(bare.fields.get("product").map(String::as_str), Some("Loan"));
    assert_eq!(bare.fields.get("cluid").map(String::as_str), Some(X));
    assert_eq!(bare.derived_state.as_deref(), Some("OPEN"));

    h.bench
        .import_text(&format!("{X}   Jan  Novák"))
        .await
        .unwrap();
    let noted = h.bench.store().get(X).await.unwrap().unwrap();
    assert_eq!(noted.note, "Jan  Novák");
    assert_eq!(noted.derived_state.as_deref(), Some("OPEN"));
}

#[tokio::test]
async fn new_import_entries_get_empty_note_and_seeded_identifier() {
    let mut h = harness();
    h.bench.import_text("alpha, beta").await.unwrap();

    let alpha = h.bench.store().get("alpha").await.unwrap().unwrap();
    assert_eq!(alpha.note, "");
    assert_eq!(alpha.fields.get("cluid").map(String::as_str), Some("alpha"));
    assert_eq!(displayed(&h.bench), vec!["alpha", "beta"]);
}

#[tokio::test]
async fn store_failure_mid_batch_reports_applied_count() {
    let mut h = harness();
    // Each upsert writes the mapping and the last active pointer.
    h.kv.fail_writes_after(2);

    let err = h
        .bench
        .import_text(&format!("{X}\n{Y}\n{Z}"))
        .await
        .unwrap_err();

    match &err {
        ImportError::Store {
            applied,
            total,
            source,
        } => {
            assert_eq!(*applied, 1);
            assert_eq!(*total, 3);
            assert!(matches!(source, StoreError::Unavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    let status = h.bench.status().unwrap();
    assert!(status.is_error());
    assert!(status.message.contains("1 of 3"));
    assert_eq!(displayed(&h.bench), vec![X]);

    h.kv.clear_write_failures();
    let stored = h.bench.store().list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, X);
}

#[tokio::test]
async fn entry_counts_as_applied_once_its_record_is_stored() {
    let mut h = harness();
    // The record write succeeds, the last active pointer write fails.
    h.kv.fail_writes_after(1);

    let err = h.bench.import_text(&format!("{X}\n{Y}")).await.unwrap_err();

    let (applied, total) = match &err {
        ImportError::Store { applied, total, .. } => (*applied, *total),
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!((applied, total), (1, 2));
    assert_eq!(
        h.bench.status().unwrap().message,
        "Failed to import cluids: stored 1 of 2 before the error."
    );

    let stored = h.bench.store().list().await.unwrap();
    assert_eq!(stored.len(), applied);
    assert_eq!(stored[0].id, X);
    assert_eq!(displayed(&h.bench), vec![X]);
}

#[tokio::test]
async fn separator_only_import_has_no_valid_entries() {
    let mut h = harness();
    let err = h.bench.import_text(" ,;, \n ;; ").await.unwrap_err();

    assert!(matches!(err, ImportError::NoValidEntries));
    let status = h.bench.status().unwrap();
    assert!(status.is_error());
    assert_eq!(status.message, "No valid cluids found in the input.");
    assert_eq!(h.kv.write_count(), 0);
}

#[tokio::test]
async fn failed_delete_keeps_the_display_order() {
    let mut h = harness();
    h.bench
        .import_text(&format!("{X}\n{Y}\n{Z}"))
        .await
        .unwrap();

    h.kv.set_unavailable(true);
    let err = h.bench.delete_record(Y).await.unwrap_err();
    assert!(matches!(err, WorkbenchError::Store(_)));
    assert_eq!(h.bench.order().position(Y), Some(1));
    assert_eq!(h.bench.status().unwrap().message, format!("Failed to delete {Y}."));

    h.kv.set_unavailable(false);
    h.bench.refresh().await.unwrap();
    assert_eq!(displayed(&h.bench), vec![X, Y, Z]);
}

#[tokio::test]
async fn deleting_a_record_prunes_it_from_the_order() {
    let mut h = harness();
    h.bench
        .import_text(&format!("{X}\n{Y}\n{Z}"))
        .await
        .unwrap();
    h.bench.begin_note_edit(Y);

    h.bench.delete_record(Y).await.unwrap();

    assert_eq!(displayed(&h.bench), vec![X, Z]);
    assert_eq!(h.bench.order().position(Y), None);
    assert_eq!(h.bench.note_draft(Y), None);
    assert_eq!(h.bench.status().unwrap().message, format!("Deleted {Y}."));
}

#[tokio::test]
async fn drag_and_drop_survives_refresh() {
    let mut h = harness();
    h.bench
        .import_text(&format!("{X}\n{Y}\n{Z}"))
        .await
        .unwrap();

    h.bench.begin_drag(X);
    assert_eq!(h.bench.drop_on(Z), DropOutcome::Moved { from: 0, to: 2 });
    assert_eq!(displayed(&h.bench), vec![Y, Z, X]);

    h.bench.refresh().await.unwrap();
    assert_eq!(displayed(&h.bench), vec![Y, Z, X]);

    h.bench.begin_drag(Y);
    h.bench.end_drag();
    assert_eq!(h.bench.drop_on(X), DropOutcome::Ignored);
    assert_eq!(displayed(&h.bench), vec![Y, Z, X]);
}

#[tokio::test]
async fn externally_added_records_appear_after_ordered_ones_by_recency() {
    let mut h = harness();
    h.bench.import_text(X).await.unwrap();

    h.clock.advance(Duration::minutes(1));
    h.bench.store().upsert(Record::new(Z)).await.unwrap();
    h.clock.advance(Duration::minutes(1));
    h.bench.store().upsert(Record::new(Y)).await.unwrap();

    h.bench.refresh().await.unwrap();
    assert_eq!(displayed(&h.bench), vec![X, Y, Z]);
}

#[tokio::test]
async fn note_edit_saves_trimmed_draft() {
    let mut h = harness();
    h.bench
        .import_text(&format!("{X} Old Name"))
        .await
        .unwrap();

    h.bench.begin_note_edit(X);
    assert_eq!(h.bench.note_draft(X), Some("Old Name"));
    h.bench.update_note_draft(X, "  New Name  ");
    let saved = h.bench.save_note(X).await.unwrap();

    assert_eq!(saved.note, "New Name");
    assert_eq!(h.bench.note_draft(X), None);
    assert_eq!(h.bench.records()[0].note, "New Name");

    h.bench.begin_note_edit(X);
    h.bench.update_note_draft(X, "discarded");
    h.bench.cancel_note_edit(X);
    assert_eq!(h.bench.store().get(X).await.unwrap().unwrap().note, "New Name");
}

#[tokio::test]
async fn save_note_for_unknown_record_fails_with_status() {
    let mut h = harness();
    h.bench.update_note_draft("ghost", "x");
    let err = h.bench.save_note("ghost").await.unwrap_err();
    assert!(matches!(err, WorkbenchError::UnknownRecord(id) if id == "ghost"));
    assert!(h.bench.status().unwrap().is_error());
}

#[tokio::test]
async fn capture_uses_scraped_identifier_and_keeps_note() {
    let mut h = harness();
    h.bench
        .import_text(&format!("{X} Jane Doe"))
        .await
        .unwrap();

    let document = FakeDocument::with_fields(&[("Cluid", X), ("product", "Mortgage")]);
    let captured = h.bench.capture_current(&document, None).await.unwrap();

    assert_eq!(captured.id, X);
    assert_eq!(captured.note, "Jane Doe");
    assert_eq!(captured.fields.get("product").map(String::as_str), Some("Mortgage"));
    assert_eq!(
        h.bench.store().last_active().await.unwrap().as_deref(),
        Some(X)
    );
    assert_eq!(h.bench.status().unwrap().message, format!("Saved data for {X}."));
}

#[tokio::test]
async fn scraped_identifier_wins_over_supplied_one() {
    let mut h = harness();
    let document = FakeDocument::with_fields(&[("cluid", X)]);

    let captured = h.bench.capture_current(&document, Some(Y)).await.unwrap();

    assert_eq!(captured.id, X);
    assert_eq!(h.bench.store().get(Y).await.unwrap(), None);
}

#[tokio::test]
async fn capture_without_any_identifier_is_rejected() {
    let mut h = harness();
    let document = FakeDocument::with_fields(&[("product", "Mortgage")]);

    let err = h.bench.capture_current(&document, Some("  ")).await.unwrap_err();
    assert!(matches!(err, WorkbenchError::MissingIdentifier));
    assert_eq!(h.kv.write_count(), 0);

    let captured = h.bench.capture_current(&document, Some(Y)).await.unwrap();
    assert_eq!(captured.id, Y);
}

#[tokio::test]
async fn fill_pushes_fields_and_marks_record_active() {
    let mut h = harness();
    let source = FakeDocument::with_fields(&[("cluid", X), ("amount", "1000")]);
    h.bench.capture_current(&source, None).await.unwrap();
    h.bench.import_text(Y).await.unwrap();
    assert_eq!(
        h.bench.store().last_active().await.unwrap().as_deref(),
        Some(Y)
    );

    let target = FakeDocument::default();
    h.bench.fill_record(&target, X).await.unwrap();

    let filled = target.filled.lock().unwrap().clone().unwrap();
    assert_eq!(filled.get("amount").map(String::as_str), Some("1000"));
    assert_eq!(
        h.bench.store().last_active().await.unwrap().as_deref(),
        Some(X)
    );
}

#[tokio::test]
async fn broken_document_reports_error_status() {
    let mut h = harness();
    h.bench.import_text(X).await.unwrap();
    let document = FakeDocument {
        broken: true,
        ..FakeDocument::default()
    };

    let err = h.bench.fill_record(&document, X).await.unwrap_err();
    assert!(matches!(err, WorkbenchError::Document(_)));
    assert_eq!(
        h.bench.status().unwrap().message,
        "Could not load data into the page."
    );
}
