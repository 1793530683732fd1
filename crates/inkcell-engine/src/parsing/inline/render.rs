use crate::document::{Mark, Node};

/// How marks and text are spelled in an output format.
pub trait MarkSyntax {
    fn open(&self, mark: Mark, out: &mut String);
    fn close(&self, mark: Mark, out: &mut String);
    fn text(&self, text: &str, out: &mut String);
}

/// Markdown delimiters: `**`, `*`, `` ` ``.
pub struct MarkdownSyntax;

impl MarkSyntax for MarkdownSyntax {
    fn open(&self, mark: Mark, out: &mut String) {
        out.push_str(mark.delimiter());
    }

    fn close(&self, mark: Mark, out: &mut String) {
        out.push_str(mark.delimiter());
    }

    fn text(&self, text: &str, out: &mut String) {
        out.push_str(text);
    }
}

/// Renders inline text runs, keeping marks shared with the previous run open.
///
/// Only the marks that differ from the previous run are closed and reopened,
/// which is what turns `[a: I] [b: I, B] [c: I]` back into `*a **b** c*`.
pub fn render_with<S: MarkSyntax>(syntax: &S, nodes: &[Node], out: &mut String) {
    let mut open: Vec<Mark> = Vec::new();

    for node in nodes {
        let Node::Text { text, marks } = node else {
            continue;
        };
        let common = open
            .iter()
            .zip(marks)
            .take_while(|(a, b)| a == b)
            .count();
        while open.len() > common {
            if let Some(mark) = open.pop() {
                syntax.close(mark, out);
            }
        }
        for mark in &marks[common..] {
            syntax.open(*mark, out);
            open.push(*mark);
        }
        syntax.text(text, out);
    }

    while let Some(mark) = open.pop() {
        syntax.close(mark, out);
    }
}

/// Inline runs back to markdown source
pub fn render_inline(nodes: &[Node]) -> String {
    let mut out = String::new();
    render_with(&MarkdownSyntax, nodes, &mut out);
    out
}
