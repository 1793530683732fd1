use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::document::{AtomicKind, Attrs, Node, TreeDocument, attrs::decode_cell};
use crate::models::{Cell, CellId};
use crate::parsing::PLACEHOLDER_TITLE;
use crate::parsing::blocks::{block_to_source, is_fence_close};

/// Result of parsing a document, with the bookkeeping the sync engine needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCells {
    pub cells: Vec<Cell>,
    /// Number of blocks rewritten while parsing: a fence opener typed into a
    /// paragraph, or an atomic node pasted under a cell id already taken.
    /// When non-zero the tree no longer mirrors the cells and has to be
    /// re-installed.
    pub conversions: usize,
    /// For every top-level node, the index of the cell it ended up in.
    /// `None` for nodes that produced nothing (blank runs, dropped placeholders).
    pub ordinals: Vec<Option<usize>>,
}

/// How a top-level node contributes to the cell list.
#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel<'a> {
    /// A non-text cell carried in attrs
    Atomic(AtomicKind, &'a Attrs),
    /// Headings always get a cell of their own
    Heading { placeholder: bool },
    /// A paragraph holding nothing but ```` ```lang ````
    FenceOpener { language: String },
    /// Merged with neighbouring text into one markdown cell
    Text,
}

fn fence_regex() -> &'static Regex {
    static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"^```([A-Za-z0-9_+#.-]+)\s*$").expect("Invalid fence regex")
    })
}

pub fn classify_top_level(node: &Node) -> TopLevel<'_> {
    if let Some((kind, attrs)) = node.as_atomic() {
        return TopLevel::Atomic(kind, attrs);
    }
    match node {
        Node::Heading { attrs, content } => {
            let placeholder = attrs.placeholder
                || (attrs.level == 1 && plain_text(content) == PLACEHOLDER_TITLE);
            TopLevel::Heading { placeholder }
        }
        Node::Paragraph { .. } => match fence_regex().captures(&node.plain_text()) {
            Some(caps) => TopLevel::FenceOpener {
                language: caps[1].to_string(),
            },
            None => TopLevel::Text,
        },
        _ => TopLevel::Text,
    }
}

fn plain_text(content: &[Node]) -> String {
    content.iter().map(Node::plain_text).collect()
}

/// Paragraph text when the paragraph starts a ```` ``` ```` line
fn fence_line(node: &Node) -> Option<String> {
    match node {
        Node::Paragraph { content } => {
            Some(plain_text(content)).filter(|text| text.starts_with("```"))
        }
        _ => None,
    }
}

/// Whether a closing fence follows `index` before the text run ends
fn closes_later(nodes: &[Node], index: usize) -> bool {
    for node in &nodes[index + 1..] {
        match classify_top_level(node) {
            TopLevel::Atomic(..) | TopLevel::Heading { .. } => return false,
            TopLevel::FenceOpener { .. } | TopLevel::Text => {
                if fence_line(node).is_some_and(|text| is_fence_close(&text)) {
                    return true;
                }
            }
        }
    }
    false
}

/// Collects consecutive text blocks into one pending markdown cell.
struct CellAccumulator {
    out: ParsedCells,
    lines: Vec<String>,
    pending: Vec<usize>,
}

impl CellAccumulator {
    fn new(node_count: usize) -> Self {
        Self {
            out: ParsedCells {
                cells: Vec::new(),
                conversions: 0,
                ordinals: vec![None; node_count],
            },
            lines: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn push_text(&mut self, index: usize, source: String) {
        self.lines.push(source);
        self.pending.push(index);
    }

    fn emit(&mut self, index: usize, cell: Cell) {
        self.flush();
        self.out.ordinals[index] = Some(self.out.cells.len());
        self.out.cells.push(cell);
    }

    /// Emit pending text as one markdown cell; an all-blank run is dropped
    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let lines = std::mem::take(&mut self.lines);
        if lines.iter().all(|line| line.trim().is_empty()) {
            if !lines.is_empty() {
                log::trace!("Dropping {} blank block(s)", lines.len());
            }
            return;
        }
        let ordinal = self.out.cells.len();
        for index in pending {
            self.out.ordinals[index] = Some(ordinal);
        }
        self.out.cells.push(Cell::markdown(lines.join("\n")));
    }

    fn finish(mut self) -> ParsedCells {
        self.flush();
        self.out
    }
}

/// Walk top-level nodes in order and build the cell list.
///
/// Shared by the tree parser and the markup fallback so both group cells
/// the same way.
pub fn parse_nodes(nodes: &[Node]) -> ParsedCells {
    let has_real_heading = nodes.iter().any(|node| {
        matches!(
            classify_top_level(node),
            TopLevel::Heading { placeholder: false }
        )
    });
    let mut acc = CellAccumulator::new(nodes.len());
    let mut placeholder_emitted = false;
    let mut in_fence = false;
    let mut atomic_ids: HashSet<CellId> = HashSet::new();

    for (index, node) in nodes.iter().enumerate() {
        match classify_top_level(node) {
            TopLevel::Atomic(kind, attrs) => {
                log::trace!("Node {index}: atomic {}", kind.markup_name());
                in_fence = false;
                let mut cell = decode_cell(kind, attrs);
                if !atomic_ids.insert(cell.id.clone()) {
                    let fresh = CellId::generate();
                    log::debug!("Node {index}: cell id {} already used, now {fresh}", cell.id);
                    atomic_ids.insert(fresh.clone());
                    cell.id = fresh;
                    acc.out.conversions += 1;
                }
                acc.emit(index, cell);
            }
            TopLevel::Heading { placeholder: true }
                if has_real_heading || placeholder_emitted =>
            {
                log::trace!("Node {index}: dropping placeholder title");
            }
            TopLevel::Heading { placeholder } => {
                in_fence = false;
                placeholder_emitted |= placeholder;
                acc.emit(index, heading_cell(node));
            }
            TopLevel::FenceOpener { .. } | TopLevel::Text if in_fence => {
                if fence_line(node).is_some_and(|text| is_fence_close(&text)) {
                    in_fence = false;
                }
                acc.push_text(index, block_to_source(node));
            }
            TopLevel::FenceOpener { language } if !closes_later(nodes, index) => {
                log::debug!("Node {index}: fence opener becomes a {language} code cell");
                acc.emit(index, Cell::code(language, ""));
                acc.out.conversions += 1;
            }
            TopLevel::FenceOpener { .. } | TopLevel::Text => {
                in_fence = fence_line(node).is_some() && closes_later(nodes, index);
                acc.push_text(index, block_to_source(node));
            }
        }
    }

    acc.finish()
}

fn heading_cell(node: &Node) -> Cell {
    let mut cell = Cell::markdown(block_to_source(node));
    if let Node::Heading { attrs, .. } = node {
        cell.metadata.anchor = attrs.anchor.clone();
    }
    cell
}

/// Tree document → cell list
pub fn parse(doc: &TreeDocument) -> Vec<Cell> {
    parse_nodes(&doc.content).cells
}

pub fn parse_detailed(doc: &TreeDocument) -> ParsedCells {
    parse_nodes(&doc.content)
}

/// Cell index each top-level node belongs to, with the parser's grouping
pub fn cell_ordinals(doc: &TreeDocument) -> Vec<Option<usize>> {
    parse_nodes(&doc.content).ordinals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadingAttrs;
    use pretty_assertions::assert_eq;

    fn para(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    fn contents(cells: &[Cell]) -> Vec<&str> {
        cells.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn fence_opener_is_classified() {
        assert_eq!(
            classify_top_level(&para("```rust")),
            TopLevel::FenceOpener {
                language: "rust".into()
            }
        );
        assert_eq!(classify_top_level(&para("```")), TopLevel::Text);
        assert_eq!(classify_top_level(&para("``` rust")), TopLevel::Text);
    }

    #[test]
    fn ordinals_follow_grouping() {
        let doc = TreeDocument::new(vec![
            Node::heading(1, vec![Node::text("T")]),
            para("a"),
            para("b"),
            Node::CodeBlock {
                attrs: Attrs::new().with("cellId", "c1"),
            },
            Node::paragraph(vec![]),
        ]);
        let parsed = parse_detailed(&doc);
        assert_eq!(contents(&parsed.cells), vec!["# T", "a\nb", ""]);
        assert_eq!(
            parsed.ordinals,
            vec![Some(0), Some(1), Some(1), Some(2), None]
        );
    }

    #[test]
    fn placeholder_flag_marks_a_placeholder() {
        let doc = TreeDocument::new(vec![
            Node::Heading {
                attrs: HeadingAttrs {
                    level: 2,
                    anchor: None,
                    placeholder: true,
                },
                content: vec![Node::text("Draft")],
            },
            Node::heading(2, vec![Node::text("Real")]),
        ]);
        assert_eq!(contents(&parse(&doc)), vec!["## Real"]);
    }

    #[test]
    fn placeholder_is_kept_when_alone_and_emitted_once() {
        let doc = TreeDocument::new(vec![
            Node::heading(1, vec![Node::text(PLACEHOLDER_TITLE)]),
            para("body"),
            Node::heading(1, vec![Node::text(PLACEHOLDER_TITLE)]),
        ]);
        assert_eq!(contents(&parse(&doc)), vec!["# Untitled", "body"]);
    }

    #[test]
    fn heading_anchor_becomes_metadata() {
        let doc = TreeDocument::new(vec![Node::Heading {
            attrs: HeadingAttrs {
                level: 2,
                anchor: Some("setup".into()),
                placeholder: false,
            },
            content: vec![Node::text("Setup")],
        }]);
        let cells = parse(&doc);
        assert_eq!(cells[0].metadata.anchor.as_deref(), Some("setup"));
    }

    #[test]
    fn fence_conversion_is_counted() {
        let doc = TreeDocument::new(vec![para("intro"), para("```python")]);
        let parsed = parse_detailed(&doc);
        assert_eq!(parsed.conversions, 1);
        assert_eq!(parsed.cells.len(), 2);
        assert_eq!(parsed.cells[1].metadata.language.as_deref(), Some("python"));
        assert_eq!(parsed.cells[1].content, "");
    }

    #[test]
    fn closed_fence_stays_in_the_markdown_cell() {
        let doc = TreeDocument::new(vec![
            para("Example:"),
            para("```python"),
            para("# comment"),
            para("```"),
            Node::CodeBlock {
                attrs: Attrs::new().with("cellId", "c1"),
            },
            para("```sh"),
        ]);
        let parsed = parse_detailed(&doc);
        assert_eq!(
            contents(&parsed.cells),
            vec!["Example:\n```python\n# comment\n```", "", ""]
        );
        assert_eq!(parsed.cells[2].metadata.language.as_deref(), Some("sh"));
        assert_eq!(parsed.conversions, 1);
    }

    #[test]
    fn pasted_atomic_node_gets_a_fresh_id() {
        let code = Node::CodeBlock {
            attrs: Attrs::new()
                .with("cellId", "c1")
                .with("language", "sh")
                .with("code", "ls"),
        };
        let doc = TreeDocument::new(vec![code.clone(), para("between"), code]);
        let parsed = parse_detailed(&doc);

        assert_eq!(parsed.cells[0].id.as_str(), "c1");
        assert_ne!(parsed.cells[2].id, parsed.cells[0].id);
        assert_eq!(parsed.cells[2].content, "ls");
        assert_eq!(parsed.conversions, 1);
    }
}
