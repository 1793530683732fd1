use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::document::TreeDocument;
use crate::error::EngineError;
use crate::models::Cell;
use crate::parsing::parse;

/// On-disk shape of a notebook
#[derive(Debug, Serialize, Deserialize)]
struct NotebookFile {
    cells: Vec<Cell>,
}

/// Read a notebook file (`{"cells": [...]}`)
pub fn read_notebook(path: &Path) -> Result<Vec<Cell>, EngineError> {
    let content = fs::read_to_string(path)?;
    let file: NotebookFile = serde_json::from_str(&content)?;
    Ok(file.cells)
}

/// Write a notebook file as pretty JSON
pub fn write_notebook(path: &Path, cells: &[Cell]) -> Result<(), EngineError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = NotebookFile {
        cells: cells.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json + "\n")?;
    Ok(())
}

/// Open an existing notebook, or start a new one from the untitled document
pub fn open_or_create(path: &Path) -> anyhow::Result<Vec<Cell>> {
    if !path.exists() {
        log::info!("{} does not exist yet; starting a new notebook", path.display());
        return Ok(parse(&TreeDocument::untitled()));
    }
    read_notebook(path).with_context(|| format!("Failed to read notebook {}", path.display()))
}
