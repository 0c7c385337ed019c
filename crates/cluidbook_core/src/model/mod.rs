//! Domain model for cluid records.
//!
//! # Responsibility
//! - Define the persisted `Record` shape and its JSON layout.
//! - Own the lexical identifier classifier.
//!
//! # Invariants
//! - Every record is identified by exactly one opaque string id.

pub mod cluid;
pub mod record;
