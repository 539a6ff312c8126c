//! Jupyter notebook (nbformat 4) backing for the notebook port.
//!
//! Only code cells participate in binding resolution; markdown and raw
//! cells are carried opaquely and written back untouched. Port indices
//! therefore range over code cells, not over the raw cell list.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MitolinkError, Result};
use crate::notebook::Notebook;

/// nbformat stores `source` either as one string or as a list of lines
/// (each keeping its trailing newline).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Source {
    fn to_text(&self) -> String {
        match self {
            Source::Text(text) => text.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCell {
    cell_type: String,
    source: Source,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl RawCell {
    fn new_code() -> Self {
        let mut rest = Map::new();
        rest.insert("execution_count".to_string(), Value::Null);
        rest.insert("metadata".to_string(), Value::Object(Map::new()));
        rest.insert("outputs".to_string(), Value::Array(Vec::new()));
        RawCell {
            cell_type: "code".to_string(),
            source: Source::Text(String::new()),
            rest,
        }
    }

    fn is_code(&self) -> bool {
        self.cell_type == "code"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// An on-disk notebook implementing the [`Notebook`] port over its code
/// cells.
#[derive(Debug, Clone)]
pub struct NotebookDocument {
    raw: RawNotebook,
    /// Port index -> position in `raw.cells`.
    code_index: Vec<usize>,
    active: usize,
}

impl NotebookDocument {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawNotebook = serde_json::from_str(content)?;
        if let Some(version) = raw.rest.get("nbformat").and_then(Value::as_u64)
            && version != 4
        {
            return Err(MitolinkError::Notebook(format!(
                "unsupported nbformat {} (expected 4)",
                version
            )));
        }

        let mut doc = NotebookDocument {
            raw,
            code_index: Vec::new(),
            active: 0,
        };
        doc.rebuild_code_index();
        // Default focus: the last code cell, as after a run-all.
        doc.active = doc.code_index.len().saturating_sub(1);
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.raw)?;
        out.push('\n');
        Ok(out)
    }

    pub fn set_active_index(&mut self, index: usize) {
        self.active = index;
    }

    fn rebuild_code_index(&mut self) {
        self.code_index = self
            .raw
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_code())
            .map(|(i, _)| i)
            .collect();
    }

    fn check_bounds(&self, index: usize) -> Result<usize> {
        self.code_index
            .get(index)
            .copied()
            .ok_or(MitolinkError::CellOutOfBounds {
                index,
                count: self.code_index.len(),
            })
    }
}

impl Notebook for NotebookDocument {
    fn cell_count(&self) -> usize {
        self.code_index.len()
    }

    fn cell_text(&self, index: usize) -> Option<String> {
        let raw_pos = self.code_index.get(index)?;
        Some(self.raw.cells[*raw_pos].source.to_text())
    }

    fn set_cell_text(&mut self, index: usize, text: &str) -> Result<()> {
        let raw_pos = self.check_bounds(index)?;
        self.raw.cells[raw_pos].source = Source::Text(text.to_string());
        Ok(())
    }

    fn insert_cell(&mut self, index: usize) -> Result<()> {
        if index > self.code_index.len() {
            return Err(MitolinkError::CellOutOfBounds {
                index,
                count: self.code_index.len(),
            });
        }
        // Place the new cell directly below the preceding code cell, so a
        // markdown cell between two code cells stays below the insertion.
        let raw_pos = match index.checked_sub(1) {
            Some(prev) => self.code_index[prev] + 1,
            None => self.code_index.first().copied().unwrap_or(self.raw.cells.len()),
        };
        self.raw.cells.insert(raw_pos, RawCell::new_code());
        self.rebuild_code_index();
        Ok(())
    }

    fn active_index(&self) -> usize {
        self.active
    }
}
