//! Core domain logic for cluidbook.
//!
//! Turns pasted text into cluid records, keeps them in a key-value store and
//! maintains a user-controlled display order over them. Rendering, the live
//! document and network observation stay outside this crate behind narrow
//! traits.

pub mod config;
pub mod db;
pub mod document;
pub mod import;
pub mod logging;
pub mod model;
pub mod observer;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig, StoreKeys};
pub use document::{DocumentError, DocumentFields};
pub use import::parser::{parse_import_entries, ImportEntry};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::cluid::is_identifier;
pub use model::record::{identifier_from_fields, product_label, FieldMap, Record};
pub use observer::{
    apply_observed_update, classify_exchange, ActiveTarget, ExchangePhase, ObservedExchange,
    ObservedUpdate,
};
pub use repo::record_repo::{Clock, RecordStore, StoreError, StoreResult, SystemClock};
pub use service::order::{reconcile, DisplayOrder};
pub use service::reorder::{DragState, DropOutcome, ReorderController};
pub use service::workbench::{
    ImportError, ImportSummary, StatusKind, StatusMessage, Workbench, WorkbenchError,
};
pub use store::{KeyValueStore, KvError, KvResult, MemoryKvStore, SqliteKvStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
