//! # Inline Parsing
//!
//! Cursor-based parsing of a single line of markdown into text runs with
//! marks, and the reverse rendering.
//!
//! ## Modules
//!
//! - **`cursor`**: `Cursor` for character-by-character scanning
//! - **`parser`**: `parse_inline()` with `try_*` helpers per construct
//! - **`render`**: `render_inline()` and the `MarkSyntax` seam shared with markup rendering
//!
//! ## Raw Zone Precedence
//!
//! Code spans take precedence: `` `**not bold**` `` parses as a single code run.

pub mod cursor;
pub mod parser;
pub mod render;

pub use parser::parse_inline;
pub use render::{MarkSyntax, MarkdownSyntax, render_inline, render_with};
