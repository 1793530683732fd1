use crate::error::EngineError;
use crate::models::{Cell, CellId};

/// The ordered cell list: single source of truth for notebook content.
///
/// List order is reading order. Ids are expected to be unique; `set_cells`
/// does not check this (duplicate ids are a caller error).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStore {
    cells: Vec<Cell>,
    version: u64,
}

impl CellStore {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells, version: 0 }
    }

    pub fn get_cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Bumped on every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: &CellId) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.id == *id)
    }

    pub fn index_of(&self, id: &CellId) -> Option<usize> {
        self.cells.iter().position(|cell| cell.id == *id)
    }

    /// Wholesale replace
    pub fn set_cells(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
        self.touch();
    }

    pub fn add_cell(&mut self, cell: Cell, at_index: usize) -> Result<(), EngineError> {
        if at_index > self.cells.len() {
            return Err(EngineError::IndexOutOfBounds {
                index: at_index,
                len: self.cells.len(),
            });
        }
        self.cells.insert(at_index, cell);
        self.touch();
        Ok(())
    }

    /// Insert directly after an existing cell
    pub fn insert_cell_after(&mut self, after: &CellId, cell: Cell) -> Result<(), EngineError> {
        let index = self.require_index(after)?;
        self.add_cell(cell, index + 1)
    }

    pub fn update_cell(&mut self, id: &CellId, content: impl Into<String>) -> Result<(), EngineError> {
        let index = self.require_index(id)?;
        self.cells[index].content = content.into();
        self.touch();
        Ok(())
    }

    pub fn delete_cell(&mut self, id: &CellId) -> Result<Cell, EngineError> {
        let index = self.require_index(id)?;
        let removed = self.cells.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Move the cell at `from` so that it ends up at index `to`.
    ///
    /// `to` is the final position, clamped to the last index. Equal indices are a no-op.
    pub fn move_cell_to_index(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        let len = self.cells.len();
        if from >= len {
            return Err(EngineError::IndexOutOfBounds { index: from, len });
        }
        let to = to.min(len - 1);
        if from == to {
            return Ok(());
        }
        let cell = self.cells.remove(from);
        self.cells.insert(to, cell);
        self.touch();
        Ok(())
    }

    /// Duplicate a cell, inserting the copy right after it. Returns the new id.
    pub fn duplicate_cell(&mut self, id: &CellId) -> Result<CellId, EngineError> {
        let index = self.require_index(id)?;
        let copy = self.cells[index].duplicate();
        let new_id = copy.id.clone();
        self.cells.insert(index + 1, copy);
        self.touch();
        Ok(new_id)
    }

    /// Returns false when the cell is already first
    pub fn move_cell_up(&mut self, id: &CellId) -> Result<bool, EngineError> {
        let index = self.require_index(id)?;
        if index == 0 {
            return Ok(false);
        }
        self.move_cell_to_index(index, index - 1)?;
        Ok(true)
    }

    /// Returns false when the cell is already last
    pub fn move_cell_down(&mut self, id: &CellId) -> Result<bool, EngineError> {
        let index = self.require_index(id)?;
        if index + 1 >= self.cells.len() {
            return Ok(false);
        }
        self.move_cell_to_index(index, index + 1)?;
        Ok(true)
    }

    /// Replace the full list on behalf of the sync engine
    pub(crate) fn replace_from_sync(&mut self, cells: Vec<Cell>) {
        self.set_cells(cells);
    }

    /// Update a cell's content on behalf of the sync engine; unknown ids are skipped
    pub(crate) fn apply_content_from_sync(&mut self, id: &CellId, content: &str) -> bool {
        match self.cells.iter_mut().find(|cell| cell.id == *id) {
            Some(cell) => {
                cell.content = content.to_string();
                self.version += 1;
                true
            }
            None => false,
        }
    }

    fn require_index(&self, id: &CellId) -> Result<usize, EngineError> {
        self.index_of(id)
            .ok_or_else(|| EngineError::UnknownCell(id.clone()))
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}
