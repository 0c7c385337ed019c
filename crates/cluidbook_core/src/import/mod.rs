//! Bulk import text handling.
//!
//! # Responsibility
//! - Parse user-pasted text into import entries.
//!
//! # Invariants
//! - Nothing in this module touches storage or fails.

pub mod parser;
