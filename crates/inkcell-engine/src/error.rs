use thiserror::Error;

use crate::models::CellId;

/// Errors surfaced by the Cell Model API and notebook I/O.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown cell: {0}")]
    UnknownCell(CellId),
    #[error("Index {index} out of bounds for {len} cells")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Editing surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// The editing surface could not hand over its document.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface unavailable: {0}")]
    Unavailable(String),
    #[error("Surface produced malformed document JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Decoding failure for a single atomic-node attribute.
///
/// Never escapes the parser: the field falls back to its default and the
/// rest of the cell (and document) is still parsed.
#[derive(Debug, Error)]
pub enum AttrError {
    #[error("Attribute `{field}` is not valid percent-encoding: {source}")]
    Percent {
        field: &'static str,
        source: std::string::FromUtf8Error,
    },
    #[error("Attribute `{field}` is not valid JSON: {source}")]
    Json {
        field: &'static str,
        source: serde_json::Error,
    },
}
