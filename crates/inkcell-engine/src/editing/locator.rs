//! Resolve an on-screen block or a tree position to the cell it shows.

use crate::document::TreeDocument;
use crate::models::{Cell, CellId};
use crate::parsing::cell_ordinals;

/// Axis-aligned box in surface coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.mid_y())
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// A rendered block as the layout reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBlock {
    /// Set when the renderer tagged the block with its cell
    pub cell_id: Option<CellId>,
    pub rect: Rect,
}

/// What to resolve.
#[derive(Debug, Clone, Copy)]
pub enum BlockRef<'a> {
    Block(&'a LayoutBlock),
    Position(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocateMode {
    /// Only blocks that carry a cell id (explicitly or as an atomic node) resolve
    #[default]
    ExplicitOnly,
    /// Best effort: untagged blocks are counted from the top of the document
    /// and the count is used as a cell index. Can be off by some cells while
    /// structural edits are still settling.
    Positional,
}

/// Maps surface coordinates to a tree position.
pub trait PositionMapper {
    fn position_at(&self, x: f32, y: f32) -> Option<usize>;
}

/// For callers that only ever resolve explicitly tagged blocks.
pub struct NoPositions;

impl PositionMapper for NoPositions {
    fn position_at(&self, _x: f32, _y: f32) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockLocator {
    pub mode: LocateMode,
}

impl BlockLocator {
    pub fn new(mode: LocateMode) -> Self {
        Self { mode }
    }

    /// Cell id for a block or position; `None` when nothing can be located.
    pub fn locate<M: PositionMapper>(
        &self,
        target: BlockRef<'_>,
        cells: &[Cell],
        doc: &TreeDocument,
        mapper: &M,
    ) -> Option<CellId> {
        match target {
            BlockRef::Block(block) => {
                if let Some(id) = &block.cell_id {
                    return known(cells, id);
                }
                if self.mode != LocateMode::Positional {
                    return None;
                }
                let (x, y) = block.rect.center();
                let pos = mapper.position_at(x, y)?;
                self.locate_position(pos, cells, doc)
            }
            BlockRef::Position(pos) => self.locate_position(pos, cells, doc),
        }
    }

    fn locate_position(&self, pos: usize, cells: &[Cell], doc: &TreeDocument) -> Option<CellId> {
        let index = doc.top_level_index_at(pos)?;
        if let Some((_, attrs)) = doc.content.get(index).and_then(|node| node.as_atomic())
            && let Some(id) = attrs.get("cellId")
        {
            return known(cells, &CellId::from(id));
        }
        if self.mode != LocateMode::Positional {
            return None;
        }
        let ordinal = cell_ordinals(doc).get(index).copied().flatten()?;
        log::trace!("Position {pos} is top-level node {index}, cell ordinal {ordinal}");
        cells.get(ordinal).map(|cell| cell.id.clone())
    }
}

fn known(cells: &[Cell], id: &CellId) -> Option<CellId> {
    cells.iter().find(|cell| cell.id == *id).map(|cell| cell.id.clone())
}
