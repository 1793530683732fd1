use std::collections::HashSet;

use crate::document::{Node, TreeDocument};
use crate::models::Cell;

/// Validates the cell/tree correspondence after serialization.
///
/// Asserts that:
/// - Atomic nodes appear in the same order as the non-markdown cells and
///   carry their ids
/// - No text-bearing node carries a `cellId`
/// - Heading anchors are unique within the document
///
/// # Panics
/// Panics with a descriptive message if any invariant is violated.
pub fn check(cells: &[Cell], doc: &TreeDocument) {
    let expected: Vec<&str> = cells
        .iter()
        .filter(|cell| !cell.cell_type.is_text())
        .map(|cell| cell.id.as_str())
        .collect();
    let found: Vec<&str> = doc
        .content
        .iter()
        .filter_map(|node| node.as_atomic())
        .map(|(_, attrs)| attrs.get("cellId").unwrap_or_default())
        .collect();
    assert_eq!(
        found, expected,
        "atomic node ids do not mirror the non-text cells"
    );

    let mut anchors = HashSet::new();
    for node in &doc.content {
        walk(node, &mut anchors);
    }
}

fn walk<'a>(node: &'a Node, anchors: &mut HashSet<&'a str>) {
    if node.is_atomic() {
        return;
    }
    if let Node::Heading { attrs, .. } = node
        && let Some(anchor) = attrs.anchor.as_deref()
    {
        assert!(anchors.insert(anchor), "duplicate heading anchor: {anchor}");
    }
    for child in node.children() {
        assert!(
            !child.is_atomic(),
            "atomic node nested inside a text block: {child:?}"
        );
        walk(child, anchors);
    }
}
