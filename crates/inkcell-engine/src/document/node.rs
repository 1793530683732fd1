use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SurfaceError;
use crate::models::CellType;

/// Inline formatting mark on a text node.
///
/// A text node lists its marks outermost first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Code,
}

impl Mark {
    /// Markdown delimiter for this mark
    pub fn delimiter(&self) -> &'static str {
        match self {
            Mark::Bold => "**",
            Mark::Italic => "*",
            Mark::Code => "`",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingAttrs {
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Set on the reserved title heading of a brand-new document
    #[serde(default, skip_serializing_if = "is_false")]
    pub placeholder: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    pub start: u32,
}

impl Default for OrderedListAttrs {
    fn default() -> Self {
        Self { start: 1 }
    }
}

/// String-valued attributes of an atomic node: the interchange shape of a non-text cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, String>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The atomic node types: leaves from the editing surface's point of view
/// that carry a whole non-text cell in their attrs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    CodeBlock,
    ImageBlock,
    ThinkingBlock,
    FileAttachment,
    RawBlock,
}

impl AtomicKind {
    pub const ALL: [AtomicKind; 5] = [
        AtomicKind::CodeBlock,
        AtomicKind::ImageBlock,
        AtomicKind::ThinkingBlock,
        AtomicKind::FileAttachment,
        AtomicKind::RawBlock,
    ];

    /// Atomic node used for a cell type; markdown has none
    pub fn for_cell_type(cell_type: CellType) -> Option<AtomicKind> {
        match cell_type {
            CellType::Markdown => None,
            CellType::Code => Some(AtomicKind::CodeBlock),
            CellType::Image => Some(AtomicKind::ImageBlock),
            CellType::Thinking => Some(AtomicKind::ThinkingBlock),
            CellType::Link => Some(AtomicKind::FileAttachment),
            CellType::Raw => Some(AtomicKind::RawBlock),
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            AtomicKind::CodeBlock => CellType::Code,
            AtomicKind::ImageBlock => CellType::Image,
            AtomicKind::ThinkingBlock => CellType::Thinking,
            AtomicKind::FileAttachment => CellType::Link,
            AtomicKind::RawBlock => CellType::Raw,
        }
    }

    /// Name used for `data-type` in rendered markup
    pub fn markup_name(&self) -> &'static str {
        match self {
            AtomicKind::CodeBlock => "code-block",
            AtomicKind::ImageBlock => "image-block",
            AtomicKind::ThinkingBlock => "thinking-block",
            AtomicKind::FileAttachment => "file-attachment",
            AtomicKind::RawBlock => "raw-block",
        }
    }

    pub fn from_markup_name(name: &str) -> Option<AtomicKind> {
        AtomicKind::ALL
            .into_iter()
            .find(|kind| kind.markup_name() == name)
    }

    /// Attribute keys carried by this node type
    pub fn attr_keys(&self) -> &'static [&'static str] {
        match self {
            AtomicKind::CodeBlock => &[
                "cellId",
                "language",
                "code",
                "outputs",
                "enableEdit",
                "originalType",
            ],
            AtomicKind::ImageBlock => &[
                "cellId",
                "src",
                "alt",
                "markdown",
                "isGenerating",
                "generationType",
                "generationParams",
                "generationStartTime",
                "generationError",
                "generationStatus",
            ],
            AtomicKind::ThinkingBlock => &[
                "cellId",
                "agentName",
                "customText",
                "textArray",
                "useWorkflowThinking",
            ],
            AtomicKind::FileAttachment => &["cellId", "markdown"],
            AtomicKind::RawBlock => &["cellId", "content"],
        }
    }
}

/// A node of the rich-text document tree.
///
/// Serialises to the editing surface's JSON shape:
/// `{"type": "paragraph", "content": [...]}`, `{"type": "text", "text": .., "marks": [..]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Paragraph {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    BulletList {
        #[serde(default)]
        content: Vec<Node>,
    },
    OrderedList {
        #[serde(default)]
        attrs: OrderedListAttrs,
        #[serde(default)]
        content: Vec<Node>,
    },
    ListItem {
        #[serde(default)]
        content: Vec<Node>,
    },
    Blockquote {
        #[serde(default)]
        content: Vec<Node>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    CodeBlock {
        #[serde(default)]
        attrs: Attrs,
    },
    ImageBlock {
        #[serde(default)]
        attrs: Attrs,
    },
    ThinkingBlock {
        #[serde(default)]
        attrs: Attrs,
    },
    FileAttachment {
        #[serde(default)]
        attrs: Attrs,
    },
    RawBlock {
        #[serde(default)]
        attrs: Attrs,
    },
}

impl Node {
    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph { content }
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading {
            attrs: HeadingAttrs {
                level,
                anchor: None,
                placeholder: false,
            },
            content,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn atomic(kind: AtomicKind, attrs: Attrs) -> Self {
        match kind {
            AtomicKind::CodeBlock => Node::CodeBlock { attrs },
            AtomicKind::ImageBlock => Node::ImageBlock { attrs },
            AtomicKind::ThinkingBlock => Node::ThinkingBlock { attrs },
            AtomicKind::FileAttachment => Node::FileAttachment { attrs },
            AtomicKind::RawBlock => Node::RawBlock { attrs },
        }
    }

    /// Kind and attrs of an atomic node
    pub fn as_atomic(&self) -> Option<(AtomicKind, &Attrs)> {
        match self {
            Node::CodeBlock { attrs } => Some((AtomicKind::CodeBlock, attrs)),
            Node::ImageBlock { attrs } => Some((AtomicKind::ImageBlock, attrs)),
            Node::ThinkingBlock { attrs } => Some((AtomicKind::ThinkingBlock, attrs)),
            Node::FileAttachment { attrs } => Some((AtomicKind::FileAttachment, attrs)),
            Node::RawBlock { attrs } => Some((AtomicKind::RawBlock, attrs)),
            _ => None,
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.as_atomic().is_some()
    }

    /// Child nodes of a branch node (empty for leaves)
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph { content }
            | Node::Heading { content, .. }
            | Node::BulletList { content }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content } => content,
            _ => &[],
        }
    }

    /// Concatenated text of all descendant text nodes, marks dropped
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text { text, .. } => text.clone(),
            _ => self.children().iter().map(Node::plain_text).collect(),
        }
    }

    /// Size in tree positions: one per character of text, one per atomic leaf,
    /// two (open + close) plus content for every branch.
    pub fn node_size(&self) -> usize {
        match self {
            Node::Text { text, .. } => text.chars().count(),
            _ if self.is_atomic() => 1,
            _ => 2 + self.children().iter().map(Node::node_size).sum::<usize>(),
        }
    }
}

/// The whole rich-text document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "doc")]
pub struct TreeDocument {
    #[serde(default)]
    pub content: Vec<Node>,
}

impl TreeDocument {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    /// A document holding a single empty paragraph
    pub fn empty() -> Self {
        Self::new(vec![Node::paragraph(Vec::new())])
    }

    /// A brand-new document: the reserved placeholder title plus an empty paragraph
    pub fn untitled() -> Self {
        Self::new(vec![
            Node::Heading {
                attrs: HeadingAttrs {
                    level: 1,
                    anchor: None,
                    placeholder: true,
                },
                content: vec![Node::text(crate::parsing::PLACEHOLDER_TITLE)],
            },
            Node::paragraph(Vec::new()),
        ])
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Serialising plain data with string keys cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, SurfaceError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Size of the document content in tree positions
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Index of the top-level node containing position `pos`.
    ///
    /// A position on the boundary between two nodes belongs to the following
    /// node; the end of the document belongs to the last node.
    pub fn top_level_index_at(&self, pos: usize) -> Option<usize> {
        let mut offset = 0;
        for (index, node) in self.content.iter().enumerate() {
            let end = offset + node.node_size();
            if pos < end {
                return Some(index);
            }
            offset = end;
        }
        if pos == offset && !self.content.is_empty() {
            return Some(self.content.len() - 1);
        }
        None
    }

    /// Position just before the top-level node at `index`
    pub fn position_of_top_level(&self, index: usize) -> Option<usize> {
        if index >= self.content.len() {
            return None;
        }
        Some(self.content[..index].iter().map(Node::node_size).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TreeDocument {
        TreeDocument::new(vec![
            Node::heading(1, vec![Node::text("Hi")]),
            Node::CodeBlock {
                attrs: Attrs::new().with("cellId", "c1"),
            },
            Node::paragraph(vec![
                Node::text("a "),
                Node::marked_text("b", vec![Mark::Bold]),
            ]),
        ])
    }

    #[test]
    fn json_shape_matches_surface_format() {
        let json = sample().to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "doc",
                "content": [
                    {"type": "heading", "attrs": {"level": 1}, "content": [{"type": "text", "text": "Hi"}]},
                    {"type": "codeBlock", "attrs": {"cellId": "c1"}},
                    {"type": "paragraph", "content": [
                        {"type": "text", "text": "a "},
                        {"type": "text", "text": "b", "marks": [{"type": "bold"}]}
                    ]}
                ]
            })
        );
    }

    #[test]
    fn json_round_trip() {
        let doc = sample();
        assert_eq!(TreeDocument::from_json(doc.to_json()).unwrap(), doc);
    }

    #[test]
    fn unknown_node_type_is_malformed() {
        let result = TreeDocument::from_json(serde_json::json!({
            "type": "doc",
            "content": [{"type": "mysteryWidget"}]
        }));
        assert!(matches!(result, Err(SurfaceError::MalformedJson(_))));
    }

    #[test]
    fn node_sizes() {
        let doc = sample();
        assert_eq!(doc.content[0].node_size(), 4); // <h>Hi</h>
        assert_eq!(doc.content[1].node_size(), 1);
        assert_eq!(doc.content[2].node_size(), 5); // <p>a b</p>
        assert_eq!(doc.content_size(), 10);
    }

    #[test]
    fn positions_resolve_to_top_level_nodes() {
        let doc = sample();
        assert_eq!(doc.top_level_index_at(0), Some(0));
        assert_eq!(doc.top_level_index_at(3), Some(0));
        assert_eq!(doc.top_level_index_at(4), Some(1));
        assert_eq!(doc.top_level_index_at(5), Some(2));
        assert_eq!(doc.top_level_index_at(10), Some(2));
        assert_eq!(doc.top_level_index_at(11), None);

        assert_eq!(doc.position_of_top_level(2), Some(5));
        assert_eq!(doc.position_of_top_level(3), None);
    }

    #[test]
    fn atomic_kinds_cover_every_non_text_cell_type() {
        for cell_type in [
            CellType::Code,
            CellType::Image,
            CellType::Thinking,
            CellType::Link,
            CellType::Raw,
        ] {
            let kind = AtomicKind::for_cell_type(cell_type).unwrap();
            assert_eq!(kind.cell_type(), cell_type);
            assert_eq!(AtomicKind::from_markup_name(kind.markup_name()), Some(kind));
        }
        assert_eq!(AtomicKind::for_cell_type(CellType::Markdown), None);
    }
}
