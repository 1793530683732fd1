//! Fallback parser over the rendered markup text.
//!
//! Used when the editing surface cannot hand over its tree as JSON. Tags are
//! tokenised by hand and attributes are found by string lookup; the rebuilt
//! blocks go through the same cell accumulator as the tree parser.

use regex::Regex;
use std::sync::OnceLock;

use crate::document::markup::attr_key_from_data;
use crate::document::{AtomicKind, Attrs, HeadingAttrs, Mark, Node, OrderedListAttrs};
use crate::models::Cell;
use crate::parsing::parse::{ParsedCells, parse_nodes};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Open { name: &'a str, attrs: &'a str },
    Close { name: &'a str },
    Text(&'a str),
}

/// Split markup into tags and text. Quoted attribute values may contain `>`.
fn tokenize(markup: &str) -> Vec<Token<'_>> {
    let bytes = markup.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            let end = markup[i..].find('<').map_or(markup.len(), |off| i + off);
            tokens.push(Token::Text(&markup[i..end]));
            i = end;
            continue;
        }

        let mut j = i + 1;
        let mut in_quote = false;
        while j < bytes.len() && (in_quote || bytes[j] != b'>') {
            if bytes[j] == b'"' {
                in_quote = !in_quote;
            }
            j += 1;
        }
        if j >= bytes.len() {
            // Unterminated tag: keep the rest as text
            tokens.push(Token::Text(&markup[i..]));
            break;
        }

        let body = markup[i + 1..j].trim().trim_end_matches('/').trim_end();
        if let Some(name) = body.strip_prefix('/') {
            tokens.push(Token::Close { name: name.trim() });
        } else {
            let split = body
                .find(|c: char| c.is_whitespace())
                .unwrap_or(body.len());
            tokens.push(Token::Open {
                name: &body[..split],
                attrs: &body[split..],
            });
        }
        i = j + 1;
    }

    tokens
}

fn attr_regex() -> &'static Regex {
    static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)="([^"]*)""#).expect("Invalid attribute regex")
    })
}

/// Looks up one attribute in a tag's attribute string, entity-decoded.
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    attr_regex()
        .captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .map(|caps| html_escape::decode_html_entities(&caps[2]).into_owned())
}

/// All `data-*` attributes except `data-type`, keyed by their camelCase attr name.
fn data_attrs(attrs: &str) -> Attrs {
    let mut out = Attrs::new();
    for caps in attr_regex().captures_iter(attrs) {
        let Some(name) = caps[1].strip_prefix("data-") else {
            continue;
        };
        if name == "type" {
            continue;
        }
        out.insert(
            attr_key_from_data(name),
            html_escape::decode_html_entities(&caps[2]).into_owned(),
        );
    }
    out
}

fn mark_for_tag(name: &str) -> Option<Mark> {
    match name {
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "code" => Some(Mark::Code),
        _ => None,
    }
}

#[derive(Debug)]
enum FrameKind {
    Root,
    Paragraph,
    Heading(HeadingAttrs),
    BulletList,
    OrderedList(OrderedListAttrs),
    ListItem,
    Blockquote,
    Atomic(AtomicKind, Attrs),
    /// Unknown element: its children are spliced into the parent
    Transparent,
}

#[derive(Debug)]
struct Frame {
    tag: String,
    kind: FrameKind,
    children: Vec<Node>,
}

impl Frame {
    fn new(tag: &str, kind: FrameKind) -> Self {
        Self {
            tag: tag.to_string(),
            kind,
            children: Vec::new(),
        }
    }

    /// Turn the closed frame into the nodes it contributes to its parent.
    fn into_nodes(self) -> Vec<Node> {
        let content = self.children;
        let node = match self.kind {
            FrameKind::Root | FrameKind::Transparent => return content,
            FrameKind::Paragraph => Node::Paragraph { content },
            FrameKind::Heading(attrs) => Node::Heading { attrs, content },
            FrameKind::BulletList => Node::BulletList { content },
            FrameKind::OrderedList(attrs) => Node::OrderedList { attrs, content },
            FrameKind::ListItem => Node::ListItem { content },
            FrameKind::Blockquote => Node::Blockquote { content },
            FrameKind::Atomic(kind, attrs) => Node::atomic(kind, attrs),
        };
        vec![node]
    }

    fn holds_inline(&self) -> bool {
        matches!(
            self.kind,
            FrameKind::Paragraph | FrameKind::Heading(_) | FrameKind::Transparent
        )
    }

    /// Block containers that wrap loose text in a paragraph
    fn takes_loose_text(&self) -> bool {
        matches!(
            self.kind,
            FrameKind::Root | FrameKind::ListItem | FrameKind::Blockquote
        )
    }

    /// A paragraph opened for loose text rather than by a `<p>` tag
    fn is_implicit(&self) -> bool {
        self.tag.is_empty() && matches!(self.kind, FrameKind::Paragraph)
    }
}

/// A frame popped off the stack: its tag, and whether it was a block
struct Closed {
    tag: String,
    block: bool,
}

/// Pop the top frame into its parent; the root is never popped.
fn close_top(stack: &mut Vec<Frame>) -> Option<Closed> {
    if stack.len() < 2 {
        return None;
    }
    let frame = stack.pop()?;
    let closed = Closed {
        tag: frame.tag.clone(),
        block: !matches!(frame.kind, FrameKind::Transparent),
    };
    let nodes = frame.into_nodes();
    if let Some(parent) = stack.last_mut() {
        parent.children.extend(nodes);
    }
    Some(closed)
}

fn open_frame(name: &str, attrs: &str) -> Frame {
    let kind = match name {
        "p" => FrameKind::Paragraph,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => FrameKind::Heading(HeadingAttrs {
            level: name[1..].parse().unwrap_or(1),
            anchor: attr_value(attrs, "data-anchor"),
            placeholder: attr_value(attrs, "data-placeholder").as_deref() == Some("true"),
        }),
        "ul" => FrameKind::BulletList,
        "ol" => FrameKind::OrderedList(OrderedListAttrs {
            start: attr_value(attrs, "start")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }),
        "li" => FrameKind::ListItem,
        "blockquote" => FrameKind::Blockquote,
        _ => match attr_value(attrs, "data-type")
            .as_deref()
            .and_then(AtomicKind::from_markup_name)
        {
            Some(kind) => FrameKind::Atomic(kind, data_attrs(attrs)),
            None => FrameKind::Transparent,
        },
    };
    Frame::new(name, kind)
}

/// Rebuilds top-level tree nodes from rendered markup.
///
/// Loose text directly inside the root, a list item or a blockquote is
/// wrapped in a paragraph. Inline marks end with the block they opened in.
pub fn markup_to_nodes(markup: &str) -> Vec<Node> {
    let mut stack = vec![Frame::new("", FrameKind::Root)];
    let mut marks: Vec<(String, Mark)> = Vec::new();

    for token in tokenize(markup) {
        match token {
            Token::Open { name, attrs } => {
                let name = name.to_ascii_lowercase();
                if let Some(mark) = mark_for_tag(&name) {
                    marks.push((name, mark));
                } else if name != "br" {
                    let frame = open_frame(&name, attrs);
                    if !matches!(frame.kind, FrameKind::Transparent)
                        && stack.last().is_some_and(Frame::is_implicit)
                    {
                        close_top(&mut stack);
                    }
                    stack.push(frame);
                }
            }
            Token::Close { name } => {
                let name = name.to_ascii_lowercase();
                if mark_for_tag(&name).is_some() {
                    if let Some(pos) = marks.iter().rposition(|(tag, _)| *tag == name) {
                        marks.remove(pos);
                    }
                    continue;
                }
                if !stack.iter().skip(1).any(|frame| frame.tag == name) {
                    log::trace!("Ignoring stray </{name}>");
                    continue;
                }
                while let Some(closed) = close_top(&mut stack) {
                    if closed.tag == name {
                        if closed.block && !marks.is_empty() {
                            log::trace!("Dropping {} unclosed mark(s) at </{name}>", marks.len());
                            marks.clear();
                        }
                        break;
                    }
                }
            }
            Token::Text(raw) => {
                let text = html_escape::decode_html_entities(raw);
                let Some(top) = stack.last() else { continue };
                let text = if top.holds_inline() {
                    text.into_owned()
                } else if top.takes_loose_text() && !text.trim().is_empty() {
                    stack.push(Frame::new("", FrameKind::Paragraph));
                    text.trim_start().to_string()
                } else {
                    continue;
                };
                if let Some(top) = stack.last_mut()
                    && !text.is_empty()
                {
                    let marks = marks.iter().map(|(_, mark)| *mark).collect();
                    top.children.push(Node::marked_text(text, marks));
                }
            }
        }
    }

    while close_top(&mut stack).is_some() {}
    stack.pop().map(Frame::into_nodes).unwrap_or_default()
}

/// Markup text → cell list
pub fn parse_markup(markup: &str) -> Vec<Cell> {
    parse_markup_detailed(markup).cells
}

pub fn parse_markup_detailed(markup: &str) -> ParsedCells {
    parse_nodes(&markup_to_nodes(markup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{TreeDocument, render_markup};
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenizer_respects_quotes() {
        let tokens = tokenize(r#"<div data-x="a>b"></div>text"#);
        assert_eq!(
            tokens,
            vec![
                Token::Open {
                    name: "div",
                    attrs: r#" data-x="a>b""#,
                },
                Token::Close { name: "div" },
                Token::Text("text"),
            ]
        );
    }

    #[test]
    fn rendered_markup_rebuilds_the_tree() {
        let doc = TreeDocument::new(vec![
            Node::heading(2, vec![Node::text("A & B")]),
            Node::paragraph(vec![
                Node::text("x "),
                Node::marked_text("y", vec![Mark::Italic, Mark::Bold]),
            ]),
            Node::BulletList {
                content: vec![Node::ListItem {
                    content: vec![Node::paragraph(vec![Node::text("item")])],
                }],
            },
            Node::atomic(
                AtomicKind::RawBlock,
                Attrs::new().with("cellId", "r1").with("content", "%3Cb%3E"),
            ),
        ]);
        assert_eq!(markup_to_nodes(&render_markup(&doc)), doc.content);
    }

    #[test]
    fn unknown_tags_are_transparent() {
        let nodes = markup_to_nodes("<section><p>kept</p></section><br>");
        assert_eq!(nodes, vec![Node::paragraph(vec![Node::text("kept")])]);
    }

    #[test]
    fn unclosed_elements_are_closed_at_the_end() {
        let nodes = markup_to_nodes("<p>dangling <strong>bold");
        assert_eq!(
            nodes,
            vec![Node::paragraph(vec![
                Node::text("dangling "),
                Node::marked_text("bold", vec![Mark::Bold]),
            ])]
        );
    }

    #[test]
    fn loose_text_in_list_items_and_quotes_is_kept() {
        let nodes = markup_to_nodes(
            "<ul><li>loose <strong>bold</strong></li></ul><blockquote>quoted<p>after</p></blockquote>",
        );
        assert_eq!(
            nodes,
            vec![
                Node::BulletList {
                    content: vec![Node::ListItem {
                        content: vec![Node::paragraph(vec![
                            Node::text("loose "),
                            Node::marked_text("bold", vec![Mark::Bold]),
                        ])],
                    }],
                },
                Node::Blockquote {
                    content: vec![
                        Node::paragraph(vec![Node::text("quoted")]),
                        Node::paragraph(vec![Node::text("after")]),
                    ],
                },
            ]
        );
        let cells = parse_markup("<ul><li>loose</li></ul>");
        insta::assert_snapshot!(cells[0].content.as_str(), @"- loose");
    }

    #[test]
    fn unclosed_mark_ends_with_its_block() {
        assert_eq!(
            markup_to_nodes("<p><strong>a</p><p>b</p>"),
            vec![
                Node::paragraph(vec![Node::marked_text("a", vec![Mark::Bold])]),
                Node::paragraph(vec![Node::text("b")]),
            ]
        );
    }

    #[test]
    fn stray_root_text_becomes_a_paragraph() {
        assert_eq!(
            markup_to_nodes("loose"),
            vec![Node::paragraph(vec![Node::text("loose")])]
        );
    }
}
