//! Repository layer over the key-value store.
//!
//! # Responsibility
//! - Map the id → record mapping onto whole-value key-value calls.
//! - Translate key-value failures into record store errors.
//!
//! # Invariants
//! - Absent ids are not errors: `get` yields `None`, `delete` is a no-op.

pub mod record_repo;
