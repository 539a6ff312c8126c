//! mitolink-core - UI-agnostic notebook model + analysis binding resolution.

pub mod callsite;
pub mod classify;
pub mod error;
pub mod notebook;
pub mod resolve;
pub mod storage;
pub mod tag;

pub use error::{MitolinkError, Result};
pub use notebook::{BufferNotebook, Notebook};
pub use resolve::{Binding, Strategy, resolve, write_generated_code};
pub use storage::NotebookDocument;
