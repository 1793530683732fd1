//! Conversion between the cell list and the tree document.
//!
//! - **`serialize`**: cells → tree (pure, total)
//! - **`parse`**: tree → cells, grouping text blocks into markdown cells
//! - **`markup_fallback`**: the same parse over rendered markup text
//! - **`blocks`** / **`inline`**: markdown source ↔ tree blocks and text runs
//! - **`anchors`**: heading anchor slugs, unique per document

pub mod anchors;
pub mod blocks;
pub mod inline;
pub mod markup_fallback;
pub mod parse;
pub mod serialize;

/// Text of the reserved title heading of a brand-new document
pub const PLACEHOLDER_TITLE: &str = "Untitled";

pub use markup_fallback::{parse_markup, parse_markup_detailed};
pub use parse::{ParsedCells, cell_ordinals, classify_top_level, parse, parse_detailed};
pub use serialize::serialize;
