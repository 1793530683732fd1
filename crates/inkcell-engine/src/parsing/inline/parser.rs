use crate::document::{Mark, Node};

use super::cursor::Cursor;

const TICK: u8 = b'`';
const STAR: &[u8] = b"*";
const DOUBLE_STAR: &[u8] = b"**";

/// Parses one line of inline markdown into text runs with marks.
///
/// Code spans are raw zones: nothing inside them is parsed. Bold and italic
/// delimiters must hug their content (`** a**` is literal text). Unclosed
/// delimiters are kept as literal text, so rendering the result reproduces
/// the input for well-formed lines.
pub fn parse_inline(s: &str) -> Vec<Node> {
    let mut out = Vec::new();
    parse_into(s, &[], &mut out);
    merge_adjacent(out)
}

fn parse_into(s: &str, marks: &[Mark], out: &mut Vec<Node>) {
    let mut cur = Cursor::new(s);
    let mut text_start = 0;

    while !cur.eof() {
        let start = cur.i;

        if let Some((inner_start, inner_end)) = try_code_span(&mut cur) {
            push_text(out, cur.slice(text_start, start), marks);
            push_text(out, cur.slice(inner_start, inner_end), &with(marks, Mark::Code));
            text_start = cur.i;
            continue;
        }

        let emphasis = try_delimited(&mut cur, Mark::Bold)
            .map(|span| (Mark::Bold, span))
            .or_else(|| try_delimited(&mut cur, Mark::Italic).map(|span| (Mark::Italic, span)));
        if let Some((mark, (inner_start, inner_end))) = emphasis {
            push_text(out, cur.slice(text_start, start), marks);
            parse_into(cur.slice(inner_start, inner_end), &with(marks, mark), out);
            text_start = cur.i;
            continue;
        }

        cur.bump();
    }

    push_text(out, cur.slice(text_start, s.len()), marks);
}

fn with(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut marks = marks.to_vec();
    marks.push(mark);
    marks
}

fn push_text(out: &mut Vec<Node>, text: &str, marks: &[Mark]) {
    if !text.is_empty() {
        out.push(Node::marked_text(text, marks.to_vec()));
    }
}

/// Joins neighbouring runs that carry the same marks.
fn merge_adjacent(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (
            Some(Node::Text { text, marks }),
            Node::Text {
                text: next,
                marks: next_marks,
            },
        ) = (merged.last_mut(), &node)
            && marks == next_marks
        {
            text.push_str(next);
            continue;
        }
        merged.push(node);
    }
    merged
}

/// Attempts a `` `code` `` span at the cursor.
///
/// Returns the inner byte range. On failure the cursor is restored.
fn try_code_span(cur: &mut Cursor<'_>) -> Option<(usize, usize)> {
    if cur.peek() != Some(TICK) {
        return None;
    }

    let saved = cur.clone();
    cur.bump_n(1);
    let inner_start = cur.i;
    while !cur.eof() && cur.peek() != Some(TICK) {
        cur.bump();
    }
    let inner_end = cur.i;

    if cur.peek() != Some(TICK) || inner_end == inner_start {
        *cur = saved;
        return None;
    }
    cur.bump_n(1);
    Some((inner_start, inner_end))
}

/// Attempts a bold (`**`) or italic (`*`) run at the cursor.
///
/// Code spans inside the run are skipped over while looking for the closer.
/// Returns the inner byte range. On failure the cursor is restored.
fn try_delimited(cur: &mut Cursor<'_>, mark: Mark) -> Option<(usize, usize)> {
    let delim = match mark {
        Mark::Bold => DOUBLE_STAR,
        Mark::Italic => STAR,
        Mark::Code => return None,
    };
    if !opens(cur, mark, delim) {
        return None;
    }

    let saved = cur.clone();
    cur.bump_n(delim.len());
    let inner_start = cur.i;

    while !cur.eof() {
        if cur.peek() == Some(TICK) {
            if try_code_span(cur).is_none() {
                cur.bump();
            }
            continue;
        }
        if closes(cur, mark, delim, inner_start) {
            let inner_end = cur.i;
            cur.bump_n(delim.len());
            return Some((inner_start, inner_end));
        }
        if mark == Mark::Italic && cur.starts_with(DOUBLE_STAR) {
            cur.bump_n(DOUBLE_STAR.len());
            continue;
        }
        cur.bump();
    }

    *cur = saved;
    None
}

fn opens(cur: &Cursor<'_>, mark: Mark, delim: &[u8]) -> bool {
    if !cur.starts_with(delim) {
        return false;
    }
    if mark == Mark::Italic && cur.starts_with(DOUBLE_STAR) {
        return false;
    }
    cur.peek_at(delim.len())
        .is_some_and(|b| !b.is_ascii_whitespace())
}

fn closes(cur: &Cursor<'_>, mark: Mark, delim: &[u8], inner_start: usize) -> bool {
    if cur.i == inner_start || !cur.starts_with(delim) {
        return false;
    }
    if mark == Mark::Italic && cur.starts_with(DOUBLE_STAR) {
        return false;
    }
    cur.prev().is_some_and(|b| !b.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_simple_text() {
        assert_eq!(parse_inline("hello world"), vec![Node::text("hello world")]);
    }

    #[test]
    fn parse_marks() {
        assert_eq!(
            parse_inline("a **b** *c* `d`"),
            vec![
                Node::text("a "),
                Node::marked_text("b", vec![Mark::Bold]),
                Node::text(" "),
                Node::marked_text("c", vec![Mark::Italic]),
                Node::text(" "),
                Node::marked_text("d", vec![Mark::Code]),
            ]
        );
    }

    #[test]
    fn code_span_is_a_raw_zone() {
        assert_eq!(
            parse_inline("`**not bold**`"),
            vec![Node::marked_text("**not bold**", vec![Mark::Code])]
        );
    }

    #[test]
    fn nested_marks_are_listed_outermost_first() {
        assert_eq!(
            parse_inline("*a **b** c*"),
            vec![
                Node::marked_text("a ", vec![Mark::Italic]),
                Node::marked_text("b", vec![Mark::Italic, Mark::Bold]),
                Node::marked_text(" c", vec![Mark::Italic]),
            ]
        );
    }

    #[test]
    fn code_inside_bold() {
        assert_eq!(
            parse_inline("**x `y` z**"),
            vec![
                Node::marked_text("x ", vec![Mark::Bold]),
                Node::marked_text("y", vec![Mark::Bold, Mark::Code]),
                Node::marked_text(" z", vec![Mark::Bold]),
            ]
        );
    }

    #[test]
    fn unclosed_delimiters_stay_literal() {
        assert_eq!(parse_inline("**open"), vec![Node::text("**open")]);
        assert_eq!(parse_inline("`tick"), vec![Node::text("`tick")]);
        assert_eq!(parse_inline("a * b * c"), vec![Node::text("a * b * c")]);
        assert_eq!(parse_inline("``"), vec![Node::text("``")]);
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            parse_inline("héllo *wörld*"),
            vec![
                Node::text("héllo "),
                Node::marked_text("wörld", vec![Mark::Italic]),
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert!(parse_inline("").is_empty());
    }
}
