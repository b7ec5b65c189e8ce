//! Table extraction through the `camelot` command line, always with the
//! `stream` (whitespace-based) parsing flavor.

use std::ffi::OsString;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use scanline_core::CamelotOptions;

use crate::error::DocumentError;

/// Stem of the export file handed to camelot; it appends
/// `-page-<p>-table-<n>.csv` per table.
pub(crate) const EXPORT_STEM: &str = "tables";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub page: u32,
    /// Position of the table on its page, from 1.
    pub order: u32,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableSet {
    pub tables: Vec<Table>,
}

impl TableSet {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }
}

pub fn camelot_argv(opts: &CamelotOptions, export_file: &Path, document: &Path) -> Vec<OsString> {
    let mut argv: Vec<OsString> = vec![
        "--format".into(),
        "csv".into(),
        "--output".into(),
        export_file.as_os_str().to_owned(),
    ];
    if let Some(pages) = &opts.pages {
        argv.push("--pages".into());
        argv.push(pages.into());
    }
    argv.push("stream".into());
    argv.push(document.as_os_str().to_owned());
    argv
}

fn re_export_name() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(&format!(r"^{EXPORT_STEM}-page-(\d+)-table-(\d+)\.csv$")).expect("invalid regex")
    })
}

/// Read every exported table in `dir`, ordered by page then position.
pub fn collect_tables(dir: &Path) -> Result<TableSet, DocumentError> {
    let mut tables = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(caps) = re_export_name().captures(name) else {
            continue;
        };
        let (Ok(page), Ok(order)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        tables.push(Table {
            page,
            order,
            rows: read_rows(&path)?,
        });
    }
    tables.sort_by_key(|t| (t.page, t.order));
    Ok(TableSet { tables })
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, DocumentError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
