use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a cell.
///
/// Assigned once at creation and never reused; the sync engine relies on it to
/// keep the cell list and the tree document in a bijection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, globally unique id
    pub fn generate() -> Self {
        Self(format!("cell-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The closed set of cell types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Markdown,
    Code,
    Image,
    Thinking,
    Link,
    Raw,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Markdown => "markdown",
            CellType::Code => "code",
            CellType::Image => "image",
            CellType::Thinking => "thinking",
            CellType::Link => "link",
            CellType::Raw => "raw",
        }
    }

    /// Markdown is the only type whose content is owned by the tree document
    pub fn is_text(&self) -> bool {
        matches!(self, CellType::Markdown)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of an image generation request attached to an `image` cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    #[serde(default)]
    pub is_generating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GenerationState {
    /// True when nothing about the generation has been recorded
    pub fn is_blank(&self) -> bool {
        *self == GenerationState::default()
    }
}

/// Type-specific metadata bag.
///
/// Only the fields relevant to a cell's type are populated:
/// `anchor` for markdown, `language` for code, `generation` for image,
/// the agent fields for thinking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// External identifier heading anchors are derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_array: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_workflow_thinking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationState>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_enable_edit() -> bool {
    true
}

/// One addressable, typed unit of notebook content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: CellId,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(default)]
    pub content: String,
    /// Execution results, only meaningful for `code` cells
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<serde_json::Value>,
    #[serde(default = "default_enable_edit")]
    pub enable_edit: bool,
    #[serde(default)]
    pub metadata: CellMetadata,
}

impl Cell {
    /// Create a cell of the given type with a freshly generated id
    pub fn new(cell_type: CellType, content: impl Into<String>) -> Self {
        Self {
            id: CellId::generate(),
            cell_type,
            content: content.into(),
            outputs: Vec::new(),
            enable_edit: true,
            metadata: CellMetadata::default(),
        }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::new(CellType::Markdown, content)
    }

    pub fn code(language: impl Into<String>, source: impl Into<String>) -> Self {
        let mut cell = Self::new(CellType::Code, source);
        let language = language.into();
        if !language.is_empty() {
            cell.metadata.language = Some(language);
        }
        cell
    }

    pub fn image(alt: &str, src: &str) -> Self {
        Self::new(CellType::Image, format!("![{alt}]({src})"))
    }

    pub fn thinking(agent_name: impl Into<String>) -> Self {
        let mut cell = Self::new(CellType::Thinking, "");
        cell.metadata.agent_name = Some(agent_name.into());
        cell
    }

    pub fn link(label: &str, href: &str) -> Self {
        Self::new(CellType::Link, format!("[{label}]({href})"))
    }

    pub fn raw(content: impl Into<String>) -> Self {
        Self::new(CellType::Raw, content)
    }

    /// Replace the generated id (builder style)
    pub fn with_id(mut self, id: impl Into<CellId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<serde_json::Value>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.metadata.anchor = Some(anchor.into());
        self
    }

    /// Copy of this cell under a new id
    pub fn duplicate(&self) -> Self {
        Self {
            id: CellId::generate(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_ids_are_unique() {
        let a = CellId::generate();
        let b = CellId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("cell-"));
    }

    #[test]
    fn duplicate_keeps_everything_but_the_id() {
        let original = Cell::code("python", "print(1)")
            .with_outputs(vec![serde_json::json!({"text": "1"})]);
        let copy = original.duplicate();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.content, original.content);
        assert_eq!(copy.outputs, original.outputs);
        assert_eq!(copy.metadata, original.metadata);
    }

    #[test]
    fn cell_json_shape() {
        let cell = Cell::code("rust", "fn main() {}").with_id("c1");
        let json = serde_json::to_value(&cell).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "c1",
                "type": "code",
                "content": "fn main() {}",
                "enableEdit": true,
                "metadata": { "language": "rust" }
            })
        );
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let cell: Cell = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "type": "markdown",
            "content": "hello"
        }))
        .unwrap();

        assert!(cell.enable_edit);
        assert!(cell.outputs.is_empty());
        assert_eq!(cell.metadata, CellMetadata::default());
    }
}
