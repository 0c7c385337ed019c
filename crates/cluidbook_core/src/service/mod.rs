//! Core use-case services.
//!
//! # Responsibility
//! - Reconcile store contents with the display order.
//! - Apply drag-and-drop moves.
//! - Orchestrate record store calls into workbench operations.

pub mod order;
pub mod reorder;
pub mod workbench;
