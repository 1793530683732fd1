pub mod cell;
pub mod cell_store;

pub use cell::{Cell, CellId, CellMetadata, CellType, GenerationState};
pub use cell_store::CellStore;
