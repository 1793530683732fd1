pub mod document;
pub mod editing;
pub mod error;
pub mod io;
pub mod models;
pub mod parsing;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use document::{AtomicKind, Attrs, HeadingAttrs, Mark, Node, TreeDocument, render_markup};
pub use editing::{
    BlockLocator, BlockRef, CellDiff, DragReorder, DragState, EditDisposition, EditKind,
    EditorSurface, LayoutBlock, LocateMode, MemorySurface, NoPositions, Notebook, OutlineEntry,
    PlannedMove, PositionMapper, Rect, SyncCoordinator, SyncState, SyncTimings, TickOutcome,
    compute_drop_index, outline,
};
pub use error::{AttrError, EngineError, SurfaceError};
pub use io::{open_or_create, read_notebook, write_notebook};
pub use models::{Cell, CellId, CellMetadata, CellStore, CellType, GenerationState};
pub use parsing::{
    PLACEHOLDER_TITLE, ParsedCells, parse, parse_detailed, parse_markup, parse_markup_detailed,
    serialize,
};
