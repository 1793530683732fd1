//! Drag-and-drop reordering of cells.

use crate::editing::locator::Rect;
use crate::error::EngineError;
use crate::models::{Cell, CellId};

/// Insertion index for a pointer at `pointer_y`.
///
/// The first block (in document order) whose vertical midpoint lies below
/// the pointer is the one to insert before; past every midpoint means the end.
pub fn compute_drop_index(pointer_y: f32, rects: &[Rect]) -> usize {
    rects
        .iter()
        .position(|rect| rect.mid_y() > pointer_y)
        .unwrap_or(rects.len())
}

/// Turn an insert-before index into the final index of the moved cell.
///
/// Removing the source first shifts everything after it up by one, so a raw
/// target past the source is decremented. Clamped to `[0, len - 1]`.
pub fn corrected_target(from: usize, raw_target: usize, len: usize) -> usize {
    let target = if from < raw_target {
        raw_target - 1
    } else {
        raw_target
    };
    target.min(len.saturating_sub(1))
}

/// A move ready to hand to `CellStore::move_cell_to_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub cell_id: CellId,
    pub from: usize,
    pub to: usize,
}

impl PlannedMove {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// A cell is locked for this drag; hovering other blocks never changes it
    Dragging { cell_id: CellId, from: usize },
    /// The pointer is over a valid drop slot (`target` is insert-before)
    Dropping {
        cell_id: CellId,
        from: usize,
        target: usize,
    },
}

/// Drag state machine: `Idle -> Dragging -> Dropping -> Idle`, with `cancel`
/// available from any state.
#[derive(Debug, Clone, Default)]
pub struct DragReorder {
    state: DragState,
}

impl DragReorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DragState::Idle
    }

    /// Lock `cell_id` as the dragged cell.
    pub fn start(&mut self, cell_id: &CellId, cells: &[Cell]) -> Result<(), EngineError> {
        let from = index_of(cells, cell_id)?;
        log::debug!("Drag start: {cell_id} at {from}");
        self.state = DragState::Dragging {
            cell_id: cell_id.clone(),
            from,
        };
        Ok(())
    }

    /// Track the pointer; returns the insert-before slot, if dragging.
    pub fn hover(&mut self, pointer_y: f32, rects: &[Rect]) -> Option<usize> {
        let (cell_id, from) = match &self.state {
            DragState::Idle => return None,
            DragState::Dragging { cell_id, from } | DragState::Dropping { cell_id, from, .. } => {
                (cell_id.clone(), *from)
            }
        };
        let target = compute_drop_index(pointer_y, rects);
        self.state = DragState::Dropping {
            cell_id,
            from,
            target,
        };
        Some(target)
    }

    /// Finish the drag and return to `Idle`.
    ///
    /// The locked cell is looked up again in `cells`, since the list may have
    /// changed under the drag. `None` when no drop slot was reached or the
    /// cell is gone.
    pub fn release(&mut self, cells: &[Cell]) -> Option<PlannedMove> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dropping {
            cell_id,
            from: started_at,
            target,
        } = state
        else {
            log::debug!("Drop without a target; drag cancelled");
            return None;
        };
        let from = index_of(cells, &cell_id).ok()?;
        if from != started_at {
            log::debug!("{cell_id} moved from {started_at} to {from} during the drag");
        }
        let to = corrected_target(from, target, cells.len());
        Some(PlannedMove { cell_id, from, to })
    }

    /// Abandon the drag (Escape, drop outside any target)
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
    }
}

fn index_of(cells: &[Cell], id: &CellId) -> Result<usize, EngineError> {
    cells
        .iter()
        .position(|cell| cell.id == *id)
        .ok_or_else(|| EngineError::UnknownCell(id.clone()))
}
