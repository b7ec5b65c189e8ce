use std::io::Write;
use std::path::{Path, PathBuf};

use scanline_core::PathConfig;
use tempfile::NamedTempFile;

use crate::error::DocumentError;

const PREFIX: &str = "scanline-";

/// Scratch locations for intermediate files. Files are created with unique
/// names and left in place; cleaning them up is the caller's business.
#[derive(Debug, Clone)]
pub struct Scratch {
    pdf_dir: PathBuf,
    text_dir: PathBuf,
}

impl Scratch {
    pub fn new(paths: &PathConfig) -> Self {
        Self {
            pdf_dir: paths.searchable_pdf_temp.clone(),
            text_dir: paths.text_file_temp.clone(),
        }
    }

    /// Create an empty, uniquely named `.pdf` file for a tool to write into.
    /// It is removed on drop unless the caller keeps it.
    pub fn reserve_pdf(&self) -> Result<NamedTempFile, DocumentError> {
        create(&self.pdf_dir, ".pdf")
    }

    pub fn persist_pdf(&self, bytes: &[u8]) -> Result<PathBuf, DocumentError> {
        persist(&self.pdf_dir, ".pdf", bytes)
    }

    pub fn persist_text(&self, text: &str) -> Result<PathBuf, DocumentError> {
        persist(&self.text_dir, ".txt", text.as_bytes())
    }
}

fn create(dir: &Path, suffix: &str) -> Result<NamedTempFile, DocumentError> {
    std::fs::create_dir_all(dir)?;
    Ok(tempfile::Builder::new()
        .prefix(PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)?)
}

fn persist(dir: &Path, suffix: &str, bytes: &[u8]) -> Result<PathBuf, DocumentError> {
    let mut file = create(dir, suffix)?;
    file.write_all(bytes)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}
