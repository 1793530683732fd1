//! Lossless encoding of non-text cells into atomic-node attributes.
//!
//! Free-form fields that may contain structural characters are
//! percent-encoded; structured fields are JSON-encoded first. Decoding is
//! forgiving: a field that fails to decode is logged and replaced by its
//! default, the rest of the cell survives.

use regex::Regex;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::OnceLock;

use crate::document::{AtomicKind, Attrs, Node};
use crate::error::AttrError;
use crate::models::{Cell, CellId, CellMetadata, GenerationState};

pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub fn percent_decode(field: &'static str, value: &str) -> Result<String, AttrError> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|source| AttrError::Percent { field, source })
}

/// JSON-encode then percent-encode
pub fn json_percent_encode<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    percent_encode(&json)
}

pub fn json_percent_decode<T: DeserializeOwned>(
    field: &'static str,
    value: &str,
) -> Result<T, AttrError> {
    let json = percent_decode(field, value)?;
    serde_json::from_str(&json).map_err(|source| AttrError::Json { field, source })
}

/// Split `![alt](src)` into `(alt, src)`
pub fn parse_image_markdown(markdown: &str) -> Option<(String, String)> {
    static IMAGE_REGEX: OnceLock<Regex> = OnceLock::new();
    let image_regex = IMAGE_REGEX.get_or_init(|| {
        Regex::new(r"^!\[([^\]]*)\]\(([^)\s]*)[^)]*\)").expect("Invalid image regex")
    });

    image_regex
        .captures(markdown.trim())
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

fn bool_attr(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Encode a non-text cell as its atomic node.
///
/// Returns `None` for markdown cells, which are encoded as native tree structure.
pub fn encode_cell(cell: &Cell) -> Option<Node> {
    let kind = AtomicKind::for_cell_type(cell.cell_type)?;
    let mut attrs = Attrs::new().with("cellId", cell.id.as_str());
    let meta = &cell.metadata;

    match kind {
        AtomicKind::CodeBlock => {
            attrs.insert("language", meta.language.clone().unwrap_or_default());
            attrs.insert("code", percent_encode(&cell.content));
            attrs.insert("outputs", json_percent_encode(&cell.outputs));
            attrs.insert("enableEdit", bool_attr(cell.enable_edit));
            attrs.insert("originalType", cell.cell_type.as_str());
        }
        AtomicKind::ImageBlock => {
            let (alt, src) = parse_image_markdown(&cell.content).unwrap_or_default();
            let generation = meta.generation.clone().unwrap_or_default();
            attrs.insert("src", src);
            attrs.insert("alt", alt);
            attrs.insert("markdown", cell.content.clone());
            attrs.insert("isGenerating", bool_attr(generation.is_generating));
            attrs.insert("generationType", generation.generation_type.unwrap_or_default());
            attrs.insert(
                "generationParams",
                generation
                    .params
                    .as_ref()
                    .map(json_percent_encode)
                    .unwrap_or_default(),
            );
            attrs.insert(
                "generationStartTime",
                generation
                    .start_time
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            );
            attrs.insert("generationError", generation.error.unwrap_or_default());
            attrs.insert("generationStatus", generation.status.unwrap_or_default());
        }
        AtomicKind::ThinkingBlock => {
            attrs.insert("agentName", meta.agent_name.clone().unwrap_or_default());
            attrs.insert("customText", json_percent_encode(&meta.custom_text));
            attrs.insert("textArray", json_percent_encode(&meta.text_array));
            attrs.insert("useWorkflowThinking", bool_attr(meta.use_workflow_thinking));
        }
        AtomicKind::FileAttachment => {
            attrs.insert("markdown", cell.content.clone());
        }
        AtomicKind::RawBlock => {
            attrs.insert("content", percent_encode(&cell.content));
        }
    }

    Some(Node::atomic(kind, attrs))
}

/// Rebuild a cell from an atomic node's attributes.
///
/// A missing or empty `cellId` gets a freshly generated id.
pub fn decode_cell(kind: AtomicKind, attrs: &Attrs) -> Cell {
    let id = attrs
        .get("cellId")
        .filter(|id| !id.is_empty())
        .map(CellId::from)
        .unwrap_or_else(CellId::generate);
    let text = |key: &str| attrs.get(key).unwrap_or_default().to_string();
    let non_empty = |key: &str| attrs.get(key).filter(|v| !v.is_empty()).map(str::to_string);
    let flag = |key: &str| attrs.get(key) == Some("true");

    for (key, _) in attrs.iter().filter(|(key, _)| !kind.attr_keys().contains(key)) {
        log::trace!("Cell {id}: ignoring unknown {} attr {key}", kind.markup_name());
    }

    let mut cell = Cell::new(kind.cell_type(), "").with_id(id);
    let mut metadata = CellMetadata::default();

    match kind {
        AtomicKind::CodeBlock => {
            cell.content = recover(&cell.id, decode_optional(attrs, "code", percent_decode));
            cell.outputs = recover(
                &cell.id,
                decode_optional(attrs, "outputs", json_percent_decode::<Vec<serde_json::Value>>),
            );
            cell.enable_edit = attrs.get("enableEdit") != Some("false");
            metadata.language = non_empty("language");
        }
        AtomicKind::ImageBlock => {
            cell.content = match non_empty("markdown") {
                Some(markdown) => markdown,
                None => match non_empty("src") {
                    Some(src) => format!("![{}]({src})", text("alt")),
                    None => String::new(),
                },
            };
            let generation = GenerationState {
                is_generating: flag("isGenerating"),
                generation_type: non_empty("generationType"),
                params: recover(
                    &cell.id,
                    decode_optional(attrs, "generationParams", json_percent_decode),
                ),
                start_time: non_empty("generationStartTime").and_then(|t| t.parse().ok()),
                error: non_empty("generationError"),
                status: non_empty("generationStatus"),
            };
            if !generation.is_blank() {
                metadata.generation = Some(generation);
            }
        }
        AtomicKind::ThinkingBlock => {
            metadata.agent_name = non_empty("agentName");
            metadata.custom_text = recover(
                &cell.id,
                decode_optional(attrs, "customText", json_percent_decode::<Option<String>>),
            );
            metadata.text_array = recover(
                &cell.id,
                decode_optional(attrs, "textArray", json_percent_decode::<Vec<String>>),
            );
            metadata.use_workflow_thinking = flag("useWorkflowThinking");
        }
        AtomicKind::FileAttachment => {
            cell.content = text("markdown");
        }
        AtomicKind::RawBlock => {
            cell.content = recover(&cell.id, decode_optional(attrs, "content", percent_decode));
        }
    }

    cell.metadata = metadata;
    debug_assert_eq!(cell.cell_type, kind.cell_type());
    cell
}

/// Decode a field when present and non-empty, otherwise its default
fn decode_optional<T: Default>(
    attrs: &Attrs,
    field: &'static str,
    decode: impl Fn(&'static str, &str) -> Result<T, AttrError>,
) -> Result<T, AttrError> {
    match attrs.get(field) {
        Some(value) if !value.is_empty() => decode(field, value),
        _ => Ok(T::default()),
    }
}

fn recover<T: Default>(cell_id: &CellId, result: Result<T, AttrError>) -> T {
    result.unwrap_or_else(|err| {
        log::warn!("Cell {cell_id}: {err}; using an empty value");
        T::default()
    })
}
