//! Line-level block structure of markdown cell content.
//!
//! Markdown cells are split into lines and each line is classified on its
//! own. Consecutive list or quote lines are grouped into one container node;
//! every other line becomes one block, blank lines included, so joining the
//! rendered lines with `\n` reproduces the cell content. Lines inside a closed
//! ```` ``` ```` fence are kept verbatim as plain paragraphs.

use regex::Regex;
use std::sync::OnceLock;

use crate::document::{Node, OrderedListAttrs};
use crate::parsing::inline::{parse_inline, render_inline};

/// Classification of a single line containing only local facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Heading { level: u8, text: &'a str },
    Bullet { text: &'a str },
    Ordered { number: u32, text: &'a str },
    Quote { text: &'a str },
    Paragraph { text: &'a str },
}

struct LinePatterns {
    heading: Regex,
    bullet: Regex,
    ordered: Regex,
    quote: Regex,
}

fn patterns() -> &'static LinePatterns {
    static PATTERNS: OnceLock<LinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinePatterns {
        heading: Regex::new(r"^(#{1,6})\s+(.*)$").expect("Invalid heading regex"),
        bullet: Regex::new(r"^[-*+]\s+(.*)$").expect("Invalid bullet regex"),
        ordered: Regex::new(r"^(\d{1,9})[.)]\s+(.*)$").expect("Invalid ordered-list regex"),
        quote: Regex::new(r"^>\s?(.*)$").expect("Invalid blockquote regex"),
    })
}

/// Classifies one line of markdown (without its newline).
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    let p = patterns();
    if let Some(caps) = p.heading.captures(line) {
        let level = caps.get(1).map_or(1, |m| m.len()) as u8;
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Heading { level, text };
    }
    if let Some(caps) = p.bullet.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        return LineKind::Bullet { text };
    }
    if let Some(caps) = p.ordered.captures(line)
        && let Some(number) = caps.get(1).and_then(|m| m.as_str().parse().ok())
    {
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Ordered { number, text };
    }
    if let Some(caps) = p.quote.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        return LineKind::Quote { text };
    }
    LineKind::Paragraph { text: line }
}

/// True for a line that closes a fenced block.
pub fn is_fence_close(line: &str) -> bool {
    line.trim_end() == "```"
}

/// Index of the line closing a fence opened on line `start`.
fn fence_end(raw: &[&str], start: usize) -> Option<usize> {
    if !raw[start].starts_with("```") {
        return None;
    }
    raw[start + 1..]
        .iter()
        .position(|line| is_fence_close(line))
        .map(|offset| start + 1 + offset)
}

fn verbatim_line(line: &str) -> Node {
    if line.trim().is_empty() {
        Node::paragraph(Vec::new())
    } else {
        Node::paragraph(vec![Node::text(line)])
    }
}

/// Builds the tree blocks for the content of one markdown cell.
pub fn markdown_to_blocks(content: &str) -> Vec<Node> {
    let raw: Vec<&str> = content
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    let lines: Vec<LineKind<'_>> = raw.iter().map(|line| classify_line(line)).collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if let Some(end) = fence_end(&raw, i) {
            out.extend(raw[i..=end].iter().map(|line| verbatim_line(line)));
            i = end + 1;
            continue;
        }
        match lines[i] {
            LineKind::Blank => {
                out.push(Node::paragraph(Vec::new()));
                i += 1;
            }
            LineKind::Heading { level, text } => {
                out.push(Node::heading(level, parse_inline(text)));
                i += 1;
            }
            LineKind::Paragraph { text } => {
                out.push(Node::paragraph(parse_inline(text)));
                i += 1;
            }
            LineKind::Bullet { .. } => {
                let mut items = Vec::new();
                while let Some(LineKind::Bullet { text }) = lines.get(i) {
                    items.push(list_item(text));
                    i += 1;
                }
                out.push(Node::BulletList { content: items });
            }
            LineKind::Ordered { number, .. } => {
                let mut items = Vec::new();
                while let Some(LineKind::Ordered { text, .. }) = lines.get(i) {
                    items.push(list_item(text));
                    i += 1;
                }
                out.push(Node::OrderedList {
                    attrs: OrderedListAttrs { start: number },
                    content: items,
                });
            }
            LineKind::Quote { .. } => {
                let mut paragraphs = Vec::new();
                while let Some(LineKind::Quote { text }) = lines.get(i) {
                    paragraphs.push(Node::paragraph(parse_inline(text)));
                    i += 1;
                }
                out.push(Node::Blockquote {
                    content: paragraphs,
                });
            }
        }
    }

    out
}

fn list_item(text: &str) -> Node {
    Node::ListItem {
        content: vec![Node::paragraph(parse_inline(text))],
    }
}

const LIST_INDENT: &str = "  ";

/// Renders a text-bearing block back to markdown source lines.
///
/// Atomic nodes render nothing; they are never part of markdown content.
pub fn block_to_markdown(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Paragraph { content } => out.push(render_inline(content)),
        Node::Heading { attrs, content } => {
            let hashes = "#".repeat(attrs.level.clamp(1, 6) as usize);
            out.push(format!("{hashes} {}", render_inline(content)));
        }
        Node::BulletList { content } => {
            for item in content {
                list_item_to_markdown(item, "- ", out);
            }
        }
        Node::OrderedList { attrs, content } => {
            for (offset, item) in content.iter().enumerate() {
                let number = attrs.start as usize + offset;
                list_item_to_markdown(item, &format!("{number}. "), out);
            }
        }
        Node::ListItem { .. } => list_item_to_markdown(node, "- ", out),
        Node::Blockquote { content } => {
            let mut inner = Vec::new();
            for child in content {
                block_to_markdown(child, &mut inner);
            }
            out.extend(inner.into_iter().map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            }));
        }
        Node::Text { .. } => out.push(render_inline(std::slice::from_ref(node))),
        Node::CodeBlock { .. }
        | Node::ImageBlock { .. }
        | Node::ThinkingBlock { .. }
        | Node::FileAttachment { .. }
        | Node::RawBlock { .. } => {}
    }
}

/// First paragraph goes on the marker line; anything else is indented below it.
fn list_item_to_markdown(item: &Node, marker: &str, out: &mut Vec<String>) {
    let children = match item {
        Node::ListItem { content } => content.as_slice(),
        other => std::slice::from_ref(other),
    };
    let (first_line, rest) = match children.split_first() {
        Some((Node::Paragraph { content }, rest)) => (render_inline(content), rest),
        _ => (String::new(), children),
    };
    out.push(format!("{marker}{first_line}"));

    let mut nested = Vec::new();
    for child in rest {
        block_to_markdown(child, &mut nested);
    }
    out.extend(
        nested
            .into_iter()
            .map(|line| format!("{LIST_INDENT}{line}")),
    );
}

/// Renders one top-level block to a single markdown string
pub fn block_to_source(node: &Node) -> String {
    let mut lines = Vec::new();
    block_to_markdown(node, &mut lines);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Mark;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("", LineKind::Blank)]
    #[case("   ", LineKind::Blank)]
    #[case("## Title", LineKind::Heading { level: 2, text: "Title" })]
    #[case("####### seven", LineKind::Paragraph { text: "####### seven" })]
    #[case("#hashtag", LineKind::Paragraph { text: "#hashtag" })]
    #[case("- item", LineKind::Bullet { text: "item" })]
    #[case("* item", LineKind::Bullet { text: "item" })]
    #[case("**bold** start", LineKind::Paragraph { text: "**bold** start" })]
    #[case("3. third", LineKind::Ordered { number: 3, text: "third" })]
    #[case("1) first", LineKind::Ordered { number: 1, text: "first" })]
    #[case("> quoted", LineKind::Quote { text: "quoted" })]
    #[case(">", LineKind::Quote { text: "" })]
    #[case("plain\r", LineKind::Paragraph { text: "plain" })]
    fn classify(#[case] line: &str, #[case] expected: LineKind<'_>) {
        assert_eq!(classify_line(line), expected);
    }

    #[test]
    fn blocks_group_lists_and_quotes() {
        let blocks = markdown_to_blocks("- a\n- **b**\n\n2. x\n3. y\n> q");
        assert_eq!(
            blocks,
            vec![
                Node::BulletList {
                    content: vec![list_item("a"), list_item("**b**")],
                },
                Node::paragraph(vec![]),
                Node::OrderedList {
                    attrs: OrderedListAttrs { start: 2 },
                    content: vec![list_item("x"), list_item("y")],
                },
                Node::Blockquote {
                    content: vec![Node::paragraph(vec![Node::text("q")])],
                },
            ]
        );
        assert_eq!(
            list_item("**b**"),
            Node::ListItem {
                content: vec![Node::paragraph(vec![Node::marked_text(
                    "b",
                    vec![Mark::Bold]
                )])]
            }
        );
    }

    #[rstest]
    #[case("plain")]
    #[case("# Heading with *style*")]
    #[case("- a\n- b")]
    #[case("1. one\n2. two")]
    #[case("> quote\n>\n> more")]
    #[case("first\n\nsecond")]
    #[case("  indented text")]
    #[case("Example:\n```python\nprint(1)\n```")]
    #[case("```\nnever closed")]
    fn canonical_markdown_round_trips(#[case] source: &str) {
        let lines: Vec<String> = markdown_to_blocks(source)
            .iter()
            .map(block_to_source)
            .collect();
        assert_eq!(lines.join("\n"), source);
    }

    #[test]
    fn fenced_lines_stay_verbatim() {
        let blocks = markdown_to_blocks("```md\n# not a heading\n\n- **x**\n```\n**y**");
        assert_eq!(
            blocks,
            vec![
                Node::paragraph(vec![Node::text("```md")]),
                Node::paragraph(vec![Node::text("# not a heading")]),
                Node::paragraph(vec![]),
                Node::paragraph(vec![Node::text("- **x**")]),
                Node::paragraph(vec![Node::text("```")]),
                Node::paragraph(vec![Node::marked_text("y", vec![Mark::Bold])]),
            ]
        );
    }

    #[test]
    fn nested_list_content_is_indented() {
        let item = Node::ListItem {
            content: vec![
                Node::paragraph(vec![Node::text("outer")]),
                Node::BulletList {
                    content: vec![list_item("inner")],
                },
            ],
        };
        let list = Node::BulletList {
            content: vec![item],
        };
        assert_eq!(block_to_source(&list), "- outer\n  - inner");
    }
}
