use crate::document::{TreeDocument, render_markup};
use crate::error::SurfaceError;

/// The rich-text editing surface, seen from the sync engine.
///
/// The surface owns the tree document. The engine only ever replaces it
/// wholesale with `install`; surfaces are expected to report that
/// installation back as an ordinary change notification (the self-echo).
pub trait EditorSurface {
    /// Replace the whole document
    fn install(&mut self, doc: TreeDocument);

    /// The current tree as surface JSON
    fn to_json(&self) -> Result<serde_json::Value, SurfaceError>;

    /// The current tree as rendered markup text
    fn to_markup(&self) -> Result<String, SurfaceError>;
}

/// In-memory surface holding a `TreeDocument`.
///
/// Counts installations and can be told to fail either export path, which is
/// how the parser fallbacks are exercised.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    doc: TreeDocument,
    installs: usize,
    json_broken: bool,
    markup_broken: bool,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new(TreeDocument::empty())
    }
}

impl MemorySurface {
    pub fn new(doc: TreeDocument) -> Self {
        Self {
            doc,
            installs: 0,
            json_broken: false,
            markup_broken: false,
        }
    }

    pub fn document(&self) -> &TreeDocument {
        &self.doc
    }

    /// Number of wholesale installations so far
    pub fn installs(&self) -> usize {
        self.installs
    }

    /// A user edit: replace the document without counting an installation
    pub fn replace(&mut self, doc: TreeDocument) {
        self.doc = doc;
    }

    /// A user edit applied in place
    pub fn edit(&mut self, f: impl FnOnce(&mut TreeDocument)) {
        f(&mut self.doc);
    }

    pub fn set_json_broken(&mut self, broken: bool) {
        self.json_broken = broken;
    }

    pub fn set_markup_broken(&mut self, broken: bool) {
        self.markup_broken = broken;
    }
}

impl EditorSurface for MemorySurface {
    fn install(&mut self, doc: TreeDocument) {
        self.doc = doc;
        self.installs += 1;
    }

    fn to_json(&self) -> Result<serde_json::Value, SurfaceError> {
        if self.json_broken {
            return Err(SurfaceError::Unavailable("JSON export disabled".into()));
        }
        Ok(self.doc.to_json())
    }

    fn to_markup(&self) -> Result<String, SurfaceError> {
        if self.markup_broken {
            return Err(SurfaceError::Unavailable("markup export disabled".into()));
        }
        Ok(render_markup(&self.doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    #[test]
    fn install_counts_but_user_edits_do_not() {
        let mut surface = MemorySurface::default();
        surface.install(TreeDocument::untitled());
        surface.replace(TreeDocument::empty());
        surface.edit(|doc| doc.content.push(Node::paragraph(vec![Node::text("x")])));

        assert_eq!(surface.installs(), 1);
        assert_eq!(surface.document().content.len(), 2);
    }

    #[test]
    fn broken_exports_report_unavailable() {
        let mut surface = MemorySurface::default();
        surface.set_json_broken(true);
        surface.set_markup_broken(true);
        assert!(matches!(surface.to_json(), Err(SurfaceError::Unavailable(_))));
        assert!(matches!(surface.to_markup(), Err(SurfaceError::Unavailable(_))));
    }
}
