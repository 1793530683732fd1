use crate::document::{Node, TreeDocument, attrs};
use crate::models::{Cell, CellType};
use crate::parsing::anchors::AnchorRegistry;
use crate::parsing::blocks::markdown_to_blocks;

/// Cell list → tree document.
///
/// Markdown cells become native blocks, one block per line; every other cell
/// type becomes a single atomic node. A markdown cell's `metadata.anchor`
/// is slugified onto its first heading, unique within this document. An
/// empty list yields a single empty paragraph.
pub fn serialize(cells: &[Cell]) -> TreeDocument {
    let mut anchors = AnchorRegistry::new();
    let mut content = Vec::new();

    for cell in cells {
        match cell.cell_type {
            CellType::Markdown => {
                let mut blocks = markdown_to_blocks(&cell.content);
                if let Some(anchor) = cell
                    .metadata
                    .anchor
                    .as_deref()
                    .and_then(|external| anchors.claim(external))
                {
                    set_first_heading_anchor(&mut blocks, anchor);
                }
                content.extend(blocks);
            }
            CellType::Code
            | CellType::Image
            | CellType::Thinking
            | CellType::Link
            | CellType::Raw => {
                if let Some(node) = attrs::encode_cell(cell) {
                    content.push(node);
                }
            }
        }
    }

    if content.is_empty() {
        return TreeDocument::empty();
    }
    TreeDocument::new(content)
}

fn set_first_heading_anchor(blocks: &mut [Node], anchor: String) {
    if let Some(attrs) = blocks.iter_mut().find_map(|node| match node {
        Node::Heading { attrs, .. } => Some(attrs),
        _ => None,
    }) {
        attrs.anchor = Some(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AtomicKind, HeadingAttrs, Mark};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_list_is_one_empty_paragraph() {
        assert_eq!(serialize(&[]), TreeDocument::empty());
    }

    #[test]
    fn markdown_becomes_native_blocks() {
        let doc = serialize(&[Cell::markdown("# Title\nSome **bold** text")]);
        assert_eq!(
            doc.content,
            vec![
                Node::heading(1, vec![Node::text("Title")]),
                Node::paragraph(vec![
                    Node::text("Some "),
                    Node::marked_text("bold", vec![Mark::Bold]),
                    Node::text(" text"),
                ]),
            ]
        );
    }

    #[test]
    fn code_becomes_atomic_node() {
        let doc = serialize(&[Cell::code("python", "print(1)").with_id("c1")]);
        let (kind, attrs) = doc.content[0].as_atomic().unwrap();
        assert_eq!(kind, AtomicKind::CodeBlock);
        assert_eq!(attrs.get("cellId"), Some("c1"));
        assert_eq!(attrs.get("code"), Some("print%281%29"));
    }

    #[test]
    fn anchors_come_from_metadata_and_stay_unique() {
        let doc = serialize(&[
            Cell::markdown("# Intro").with_anchor("Intro"),
            Cell::markdown("## Intro again").with_anchor("intro"),
            Cell::markdown("## No anchor"),
        ]);
        let anchors: Vec<Option<&str>> = doc
            .content
            .iter()
            .map(|node| match node {
                Node::Heading {
                    attrs: HeadingAttrs { anchor, .. },
                    ..
                } => anchor.as_deref(),
                _ => None,
            })
            .collect();
        assert_eq!(anchors, vec![Some("intro"), Some("intro-2"), None]);
    }
}
