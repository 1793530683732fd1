pub mod attrs;
pub mod markup;
pub mod node;

pub use markup::render_markup;
pub use node::{AtomicKind, Attrs, HeadingAttrs, Mark, Node, OrderedListAttrs, TreeDocument};
