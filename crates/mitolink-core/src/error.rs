//! Error types for Mitolink core.

use thiserror::Error;

/// Errors that can occur when loading, mutating, or saving notebooks.
///
/// Binding resolution itself never errors: not-found and malformed
/// call-sites degrade to `None` / empty results.
#[derive(Error, Debug)]
pub enum MitolinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notebook parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a notebook: {0}")]
    Notebook(String),

    #[error("Cell index {index} out of bounds (notebook has {count} cells)")]
    CellOutOfBounds { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, MitolinkError>;
