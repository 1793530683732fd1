/*!
 * # Editing Core Module
 *
 * Keeps the cell list and the editing surface's tree document consistent
 * while either side is being edited.
 *
 * ## Module Structure
 *
 * - **`surface`**: `EditorSurface` trait (install / export) and the in-memory `MemorySurface`
 * - **`diff`**: structural vs content-only comparison, structural merge, markdown id reconciliation
 * - **`sync`**: `SyncCoordinator` state machine (`Idle | AwaitingSelfEcho | Debouncing`)
 * - **`locator`**: `BlockLocator` from layout blocks or tree positions to cell ids
 * - **`reorder`**: drop-index computation and the `DragReorder` state machine
 * - **`outline`**: heading outline with the serializer's anchors
 * - **`notebook`**: `Notebook`, the session tying store, surface and coordinator together
 *
 * ## Usage Pattern
 *
 * ```rust
 * use inkcell_engine::editing::*;
 * use inkcell_engine::models::Cell;
 * use std::time::Instant;
 *
 * let mut nb = Notebook::new(
 *     vec![Cell::markdown("# Hello")],
 *     MemorySurface::default(),
 *     SyncTimings::default(),
 * );
 *
 * // Programmatic changes re-serialize the tree
 * nb.add_cell(Cell::code("python", "print(1)"), 1).unwrap();
 *
 * // Surface notifications are forwarded, and deadlines driven by the host loop
 * nb.on_surface_change(EditKind::Text, Instant::now());
 * nb.tick(Instant::now());
 * ```
 */

pub mod diff;
pub mod locator;
pub mod notebook;
pub mod outline;
pub mod reorder;
pub mod surface;
pub mod sync;

pub use diff::{CellDiff, ContentUpdate, diff_cells, merge_structural, reconcile_markdown_ids};
pub use locator::{BlockLocator, BlockRef, LayoutBlock, LocateMode, NoPositions, PositionMapper, Rect};
pub use notebook::Notebook;
pub use outline::{OutlineEntry, outline};
pub use reorder::{DragReorder, DragState, PlannedMove, compute_drop_index, corrected_target};
pub use surface::{EditorSurface, MemorySurface};
pub use sync::{EditDisposition, EditKind, SyncCoordinator, SyncState, SyncTimings, TickOutcome};
