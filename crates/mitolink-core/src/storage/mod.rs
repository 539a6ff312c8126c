//! Notebook storage (.ipynb files).

mod ipynb;

pub use ipynb::NotebookDocument;
