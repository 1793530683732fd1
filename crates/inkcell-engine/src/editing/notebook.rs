use std::time::Instant;

use crate::document::TreeDocument;
use crate::editing::reorder::PlannedMove;
use crate::editing::surface::EditorSurface;
use crate::editing::sync::{EditDisposition, EditKind, SyncCoordinator, SyncState, SyncTimings, TickOutcome};
use crate::error::{EngineError, SurfaceError};
use crate::models::{Cell, CellId, CellStore};

/// An open notebook: the cell store, its editing surface and the
/// coordinator that keeps the two in step.
///
/// Every Cell Model mutation goes through here so the coordinator sees it.
/// A pending debounced edit is flushed before each mutation, so typing is
/// never lost to a concurrent programmatic write.
pub struct Notebook<S: EditorSurface> {
    store: CellStore,
    sync: SyncCoordinator,
    surface: S,
}

impl<S: EditorSurface> Notebook<S> {
    /// Open `cells` and install their tree on `surface`
    pub fn new(cells: Vec<Cell>, mut surface: S, timings: SyncTimings) -> Self {
        let store = CellStore::new(cells);
        let mut sync = SyncCoordinator::new(timings);
        sync.install(store.get_cells(), &mut surface, Instant::now());
        Self {
            store,
            sync,
            surface,
        }
    }

    pub fn get_cells(&self) -> &[Cell] {
        self.store.get_cells()
    }

    pub fn cell(&self, id: &CellId) -> Option<&Cell> {
        self.store.get(id)
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for simulating or forwarding user edits
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.sync.next_deadline()
    }

    /// The tree as the surface currently holds it
    pub fn current_document(&self) -> Result<TreeDocument, SurfaceError> {
        self.surface.to_json().and_then(TreeDocument::from_json)
    }

    /// Wholesale replace
    pub fn set_cells(&mut self, cells: Vec<Cell>) {
        let now = self.flush_pending();
        self.store.set_cells(cells);
        self.publish(now);
    }

    pub fn add_cell(&mut self, cell: Cell, at_index: usize) -> Result<(), EngineError> {
        self.external(|store| store.add_cell(cell, at_index))
    }

    pub fn insert_cell_after(&mut self, after: &CellId, cell: Cell) -> Result<(), EngineError> {
        self.external(|store| store.insert_cell_after(after, cell))
    }

    pub fn update_cell(&mut self, id: &CellId, content: impl Into<String>) -> Result<(), EngineError> {
        self.external(|store| store.update_cell(id, content))
    }

    pub fn delete_cell(&mut self, id: &CellId) -> Result<Cell, EngineError> {
        self.external(|store| store.delete_cell(id))
    }

    /// `to` is the final index of the moved cell
    pub fn move_cell_to_index(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        self.external(|store| store.move_cell_to_index(from, to))
    }

    pub fn duplicate_cell(&mut self, id: &CellId) -> Result<CellId, EngineError> {
        self.external(|store| store.duplicate_cell(id))
    }

    pub fn move_cell_up(&mut self, id: &CellId) -> Result<bool, EngineError> {
        self.external(|store| store.move_cell_up(id))
    }

    pub fn move_cell_down(&mut self, id: &CellId) -> Result<bool, EngineError> {
        self.external(|store| store.move_cell_down(id))
    }

    /// Apply a move produced by `DragReorder::release`.
    ///
    /// The cell is looked up by id, so a list that changed since the plan
    /// was made still moves the right cell.
    pub fn apply_move(&mut self, planned: &PlannedMove) -> Result<(), EngineError> {
        self.external(|store| {
            let from = store
                .index_of(&planned.cell_id)
                .ok_or_else(|| EngineError::UnknownCell(planned.cell_id.clone()))?;
            store.move_cell_to_index(from, planned.to)
        })
    }

    /// Forward a change notification from the surface
    pub fn on_surface_change(&mut self, kind: EditKind, now: Instant) -> EditDisposition {
        self.sync.on_surface_change(kind, now)
    }

    /// Drive debounce and echo deadlines
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.sync.tick(now, &mut self.store, &mut self.surface)
    }

    /// Parse a pending edit immediately (e.g. before saving)
    pub fn flush(&mut self, now: Instant) -> TickOutcome {
        self.sync.flush(now, &mut self.store, &mut self.surface)
    }

    fn external<T>(
        &mut self,
        op: impl FnOnce(&mut CellStore) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let now = self.flush_pending();
        let out = op(&mut self.store)?;
        self.publish(now);
        Ok(out)
    }

    /// Parse a debounced edit before the store is written
    fn flush_pending(&mut self) -> Instant {
        let now = Instant::now();
        let flushed = self.sync.flush(now, &mut self.store, &mut self.surface);
        if flushed != TickOutcome::Nothing {
            log::debug!("Flushed pending edit before external change: {flushed:?}");
        }
        now
    }

    fn publish(&mut self, now: Instant) {
        self.sync
            .on_external_change(self.store.get_cells(), &mut self.surface, now);
    }
}
