//! Reorder controller for drag-and-drop moves.
//!
//! # Responsibility
//! - Track whether a drag is in progress and which id it carries.
//! - Apply a completed drop to the display order.
//!
//! # Invariants
//! - Reordering only permutes ids; the multiset of ids never changes.
//! - `drop_on` with the dragged id as target, or without a drag, changes nothing.

use crate::service::order::DisplayOrder;
use log::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(String),
}

/// Result of a `drop_on` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Source moved to the target's former index.
    Moved { from: usize, to: usize },
    /// Drag ended but source or target was not in the order.
    Missing,
    /// No drag active, or source equals target; state untouched.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderController {
    state: DragState,
}

impl ReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Starts dragging `id`, replacing any drag in progress.
    pub fn begin_drag(&mut self, id: impl Into<String>) {
        self.state = DragState::Dragging(id.into());
    }

    /// Drops the dragged id onto `target_id`.
    ///
    /// Both indexes are taken before removal: the source is removed and then
    /// inserted at the target's old index, so a downward move lands after the
    /// target and an upward move lands before it.
    pub fn drop_on(&mut self, order: &mut DisplayOrder, target_id: &str) -> DropOutcome {
        let source_id = match &self.state {
            DragState::Dragging(source) if source != target_id => source.clone(),
            _ => return DropOutcome::Ignored,
        };
        self.state = DragState::Idle;

        match (order.position(&source_id), order.position(target_id)) {
            (Some(from), Some(to)) => {
                order.move_index(from, to);
                debug!("event=reorder_drop module=service status=ok from={from} to={to}");
                DropOutcome::Moved { from, to }
            }
            _ => DropOutcome::Missing,
        }
    }

    /// Cancels any drag in progress.
    pub fn end_drag(&mut self) {
        self.state = DragState::Idle;
    }
}
