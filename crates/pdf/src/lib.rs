//! Document-level delegation: force-OCR of whole PDFs, table extraction, and
//! the scratch files both rely on.

pub mod error;
pub mod extract;
pub mod ocrmypdf;
pub mod scratch;
pub mod tables;
mod tool;

pub use error::DocumentError;
pub use extract::Extract;
pub use scratch::Scratch;
pub use tables::{Table, TableSet};
