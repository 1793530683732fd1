use std::collections::{HashMap, HashSet};

use crate::models::{Cell, CellId, CellType};

/// A markdown cell whose text changed in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub id: CellId,
    pub content: String,
}

/// How a freshly parsed cell list differs from the last-synced one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDiff {
    Unchanged,
    /// Same ids and types at every index; only markdown text changed
    ContentOnly(Vec<ContentUpdate>),
    /// Cell count, or the id or type at some index, changed
    Structural,
}

/// Cheap check: same length and the same id and type at every index.
pub fn same_structure(a: &[Cell], b: &[Cell]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.id == y.id && x.cell_type == y.cell_type)
}

/// Compare a parse result against the previous cells.
///
/// Content of non-markdown cells is not compared: the tree only carries a
/// snapshot of it and the cell list stays authoritative.
pub fn diff_cells(previous: &[Cell], parsed: &[Cell]) -> CellDiff {
    if !same_structure(previous, parsed) {
        return CellDiff::Structural;
    }
    let updates: Vec<ContentUpdate> = previous
        .iter()
        .zip(parsed)
        .filter(|(old, new)| old.cell_type == CellType::Markdown && old.content != new.content)
        .map(|(_, new)| ContentUpdate {
            id: new.id.clone(),
            content: new.content.clone(),
        })
        .collect();
    if updates.is_empty() {
        CellDiff::Unchanged
    } else {
        CellDiff::ContentOnly(updates)
    }
}

/// Build the new cell list after a structural change.
///
/// Non-markdown cells whose id and type survive are taken verbatim from
/// `previous` (outputs, metadata and all); only their position follows the
/// parse. Surviving markdown cells take the parsed text and keep their
/// metadata, picking up a parsed anchor only when they had none.
pub fn merge_structural(previous: &[Cell], parsed: Vec<Cell>) -> Vec<Cell> {
    let by_id: HashMap<&CellId, &Cell> = previous.iter().map(|cell| (&cell.id, cell)).collect();

    parsed
        .into_iter()
        .map(|cell| match by_id.get(&cell.id) {
            Some(existing) if existing.cell_type != cell.cell_type => cell,
            Some(existing) if cell.cell_type == CellType::Markdown => {
                let mut merged = (*existing).clone();
                if merged.metadata.anchor.is_none() {
                    merged.metadata.anchor = cell.metadata.anchor;
                }
                merged.content = cell.content;
                merged
            }
            Some(existing) => (*existing).clone(),
            None => cell,
        })
        .collect()
}

/// Give freshly parsed markdown cells the ids of previous markdown cells.
///
/// First pass matches identical content, second pass matches by index among
/// the leftovers. Anything still unmatched keeps its fresh id.
pub fn reconcile_markdown_ids(previous: &[Cell], parsed: &mut [Cell]) {
    let mut used: HashSet<CellId> = parsed
        .iter()
        .filter(|cell| cell.cell_type != CellType::Markdown)
        .map(|cell| cell.id.clone())
        .collect();
    let mut matched = vec![false; parsed.len()];

    for (i, cell) in parsed.iter_mut().enumerate() {
        if cell.cell_type != CellType::Markdown {
            continue;
        }
        if let Some(old) = previous.iter().find(|old| {
            old.cell_type == CellType::Markdown
                && old.content == cell.content
                && !used.contains(&old.id)
        }) {
            cell.id = old.id.clone();
            used.insert(old.id.clone());
            matched[i] = true;
        }
    }

    for (i, cell) in parsed.iter_mut().enumerate() {
        if matched[i] || cell.cell_type != CellType::Markdown {
            continue;
        }
        if let Some(old) = previous.get(i)
            && old.cell_type == CellType::Markdown
            && !used.contains(&old.id)
        {
            cell.id = old.id.clone();
            used.insert(old.id.clone());
        }
    }
}
