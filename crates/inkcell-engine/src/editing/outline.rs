use crate::models::{Cell, CellId, CellType};
use crate::parsing::PLACEHOLDER_TITLE;
use crate::parsing::anchors::AnchorRegistry;
use crate::parsing::blocks::{LineKind, classify_line};
use crate::parsing::inline::parse_inline;

/// One heading in the document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    /// Heading text with inline marks stripped
    pub text: String,
    pub cell_id: CellId,
    /// Same anchor the serializer puts on the heading
    pub anchor: Option<String>,
}

/// Headings of all markdown cells in reading order.
///
/// The placeholder title is listed only while it is the sole heading.
pub fn outline(cells: &[Cell]) -> Vec<OutlineEntry> {
    let mut anchors = AnchorRegistry::new();
    let mut entries = Vec::new();
    let mut placeholders = Vec::new();

    for cell in cells.iter().filter(|c| c.cell_type == CellType::Markdown) {
        let mut anchor = cell
            .metadata
            .anchor
            .as_deref()
            .and_then(|external| anchors.claim(external));

        for line in cell.content.split('\n') {
            let LineKind::Heading { level, text } = classify_line(line) else {
                continue;
            };
            let text: String = parse_inline(text)
                .iter()
                .map(|node| node.plain_text())
                .collect();
            if level == 1 && text == PLACEHOLDER_TITLE {
                placeholders.push(entries.len());
            }
            entries.push(OutlineEntry {
                level,
                text,
                cell_id: cell.id.clone(),
                anchor: anchor.take(),
            });
        }
    }

    if placeholders.len() == entries.len() {
        entries.truncate(1);
    } else {
        let mut index = 0;
        entries.retain(|_| {
            let keep = !placeholders.contains(&index);
            index += 1;
            keep
        });
    }
    entries
}
