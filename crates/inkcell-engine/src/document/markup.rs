//! HTML-like markup rendering of the tree document.
//!
//! This is the editing surface's text export and the input of the fallback
//! parser. Atomic nodes render as empty `<div>`s carrying every attr as a
//! `data-*` attribute, so the fallback can recover cells by attribute lookup.

use crate::document::{Mark, Node, TreeDocument};
use crate::parsing::inline::{MarkSyntax, render_with};

/// `<strong>`, `<em>`, `<code>` with HTML-escaped text.
pub struct MarkupSyntax;

impl MarkupSyntax {
    pub fn tag(mark: Mark) -> &'static str {
        match mark {
            Mark::Bold => "strong",
            Mark::Italic => "em",
            Mark::Code => "code",
        }
    }
}

impl MarkSyntax for MarkupSyntax {
    fn open(&self, mark: Mark, out: &mut String) {
        out.push('<');
        out.push_str(Self::tag(mark));
        out.push('>');
    }

    fn close(&self, mark: Mark, out: &mut String) {
        out.push_str("</");
        out.push_str(Self::tag(mark));
        out.push('>');
    }

    fn text(&self, text: &str, out: &mut String) {
        out.push_str(&html_escape::encode_text(text));
    }
}

/// `cellId` → `cell-id`
pub fn data_attr_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// `cell-id` → `cellId`
pub fn attr_key_from_data(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            key.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            key.push(c);
        }
    }
    key
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

/// Render the whole document as markup.
pub fn render_markup(doc: &TreeDocument) -> String {
    let mut out = String::new();
    for node in &doc.content {
        render_node(node, &mut out);
    }
    out
}

fn render_children(children: &[Node], out: &mut String) {
    for child in children {
        render_node(child, out);
    }
}

fn render_node(node: &Node, out: &mut String) {
    if let Some((kind, attrs)) = node.as_atomic() {
        out.push_str("<div");
        push_attr(out, "data-type", kind.markup_name());
        for (key, value) in attrs.iter() {
            push_attr(out, &format!("data-{}", data_attr_name(key)), value);
        }
        out.push_str("></div>");
        return;
    }

    match node {
        Node::Paragraph { content } => {
            out.push_str("<p>");
            render_with(&MarkupSyntax, content, out);
            out.push_str("</p>");
        }
        Node::Heading { attrs, content } => {
            let level = attrs.level.clamp(1, 6);
            out.push_str(&format!("<h{level}"));
            if let Some(anchor) = &attrs.anchor {
                push_attr(out, "data-anchor", anchor);
            }
            if attrs.placeholder {
                push_attr(out, "data-placeholder", "true");
            }
            out.push('>');
            render_with(&MarkupSyntax, content, out);
            out.push_str(&format!("</h{level}>"));
        }
        Node::BulletList { content } => {
            out.push_str("<ul>");
            render_children(content, out);
            out.push_str("</ul>");
        }
        Node::OrderedList { attrs, content } => {
            out.push_str(&format!("<ol start=\"{}\">", attrs.start));
            render_children(content, out);
            out.push_str("</ol>");
        }
        Node::ListItem { content } => {
            out.push_str("<li>");
            render_children(content, out);
            out.push_str("</li>");
        }
        Node::Blockquote { content } => {
            out.push_str("<blockquote>");
            render_children(content, out);
            out.push_str("</blockquote>");
        }
        Node::Text { .. } => render_with(&MarkupSyntax, std::slice::from_ref(node), out),
        Node::CodeBlock { .. }
        | Node::ImageBlock { .. }
        | Node::ThinkingBlock { .. }
        | Node::FileAttachment { .. }
        | Node::RawBlock { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::parsing::serialize;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    #[test]
    fn attr_names_convert_both_ways() {
        assert_eq!(data_attr_name("cellId"), "cell-id");
        assert_eq!(data_attr_name("generationStartTime"), "generation-start-time");
        assert_eq!(attr_key_from_data("generation-start-time"), "generationStartTime");
        assert_eq!(attr_key_from_data("code"), "code");
    }

    #[test]
    fn markup_for_text_blocks() {
        let doc = serialize(&[
            Cell::markdown("# Notes & <ideas>").with_anchor("notes"),
            Cell::markdown("Some *styled **text***\n\n- one\n3. three\n> quoted `x < y`"),
        ]);
        assert_snapshot!(render_markup(&doc), @r#"<h1 data-anchor="notes">Notes &amp; &lt;ideas&gt;</h1><p>Some <em>styled <strong>text</strong></em></p><p></p><ul><li><p>one</p></li></ul><ol start="3"><li><p>three</p></li></ol><blockquote><p>quoted <code>x &lt; y</code></p></blockquote>"#);
    }

    #[test]
    fn markup_for_atomic_nodes() {
        let doc = serialize(&[Cell::link("a \"quoted\" file", "/f.pdf").with_id("l1")]);
        assert_snapshot!(render_markup(&doc), @r#"<div data-type="file-attachment" data-cell-id="l1" data-markdown="[a &quot;quoted&quot; file](/f.pdf)"></div>"#);
    }

    #[test]
    fn placeholder_heading_is_flagged() {
        let markup = render_markup(&TreeDocument::untitled());
        assert_eq!(markup, r#"<h1 data-placeholder="true">Untitled</h1><p></p>"#);
    }
}
