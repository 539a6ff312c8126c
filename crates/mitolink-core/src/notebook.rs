//! Notebook port: the host-document surface the resolver reads through.
//!
//! The resolver never touches a document directly; everything goes through
//! this trait so resolution logic can be tested against in-memory fakes and
//! reused over the on-disk ipynb representation in [`crate::storage`].

use crate::error::{MitolinkError, Result};

/// Ordered cell access over a live notebook.
///
/// Indices are stable only for the duration of a single call sequence; the
/// host document is externally mutable and nothing here caches cell text.
pub trait Notebook {
    /// Number of code cells in the notebook.
    fn cell_count(&self) -> usize;

    /// Raw text of the cell at `index`, or `None` if out of range.
    fn cell_text(&self, index: usize) -> Option<String>;

    /// Replace the text of the cell at `index`.
    fn set_cell_text(&mut self, index: usize, text: &str) -> Result<()>;

    /// Insert a new empty cell so that it becomes the cell at `index`,
    /// shifting later cells down. `index == cell_count()` appends.
    fn insert_cell(&mut self, index: usize) -> Result<()>;

    /// Index of the cell the user is currently focused on.
    fn active_index(&self) -> usize;
}

/// In-memory notebook backed by a plain vector of cell texts.
///
/// This is the test double for the port, and also what UI embeddings that
/// already hold cell buffers can hand to the resolver.
#[derive(Debug, Clone, Default)]
pub struct BufferNotebook {
    cells: Vec<String>,
    active: usize,
}

impl BufferNotebook {
    pub fn new<S: Into<String>>(cells: Vec<S>, active: usize) -> Self {
        BufferNotebook {
            cells: cells.into_iter().map(Into::into).collect(),
            active,
        }
    }

    pub fn set_active_index(&mut self, index: usize) {
        self.active = index;
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    fn check_bounds(&self, index: usize) -> Result<()> {
        if index >= self.cells.len() {
            return Err(MitolinkError::CellOutOfBounds {
                index,
                count: self.cells.len(),
            });
        }
        Ok(())
    }
}

impl Notebook for BufferNotebook {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell_text(&self, index: usize) -> Option<String> {
        self.cells.get(index).cloned()
    }

    fn set_cell_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.check_bounds(index)?;
        self.cells[index] = text.to_string();
        Ok(())
    }

    fn insert_cell(&mut self, index: usize) -> Result<()> {
        if index > self.cells.len() {
            return Err(MitolinkError::CellOutOfBounds {
                index,
                count: self.cells.len(),
            });
        }
        self.cells.insert(index, String::new());
        Ok(())
    }

    fn active_index(&self) -> usize {
        self.active
    }
}
