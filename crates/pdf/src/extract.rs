use std::path::{Path, PathBuf};

use tracing::info;

use scanline_core::{CamelotOptions, EngineBinaries, ExtractionConfig, OcrMyPdfOptions, PathConfig};

use crate::error::DocumentError;
use crate::ocrmypdf::ocrmypdf_argv;
use crate::scratch::Scratch;
use crate::tables::{camelot_argv, collect_tables, TableSet, EXPORT_STEM};
use crate::tool;

/// Document-level operations. Both delegate all real work to external tools;
/// this type only marshals their configuration and collects the output.
pub struct Extract {
    scratch: Scratch,
    ocrmypdf: OcrMyPdfOptions,
    camelot: CamelotOptions,
    binaries: EngineBinaries,
}

impl Extract {
    pub fn new(paths: &PathConfig, extraction: &ExtractionConfig, binaries: &EngineBinaries) -> Self {
        Self {
            scratch: Scratch::new(paths),
            ocrmypdf: extraction.ocrmypdf.clone(),
            camelot: extraction.camelot.clone(),
            binaries: binaries.clone(),
        }
    }

    /// OCR every page of `document` into a fresh scratch PDF and return its path.
    pub fn force_ocr(&self, document: &Path) -> Result<PathBuf, DocumentError> {
        let reserved = self.scratch.reserve_pdf()?;
        let argv = ocrmypdf_argv(&self.ocrmypdf, document, reserved.path());
        tool::run(&self.binaries.ocrmypdf, &argv)?;
        let (_, output) = reserved.keep().map_err(|e| e.error)?;
        info!(document = %document.display(), output = %output.display(), "force OCR complete");
        Ok(output)
    }

    /// Extract tables from `document` with the stream parsing flavor.
    pub fn extract_tables(&self, document: &Path) -> Result<TableSet, DocumentError> {
        let export_dir = tempfile::Builder::new().prefix("scanline-tables-").tempdir()?;
        let export_file = export_dir.path().join(format!("{EXPORT_STEM}.csv"));
        let argv = camelot_argv(&self.camelot, &export_file, document);
        tool::run(&self.binaries.camelot, &argv)?;
        let tables = collect_tables(export_dir.path())?;
        info!(document = %document.display(), tables = tables.len(), "table extraction complete");
        Ok(tables)
    }

    /// Store a searchable PDF byte stream as a scratch file.
    pub fn persist_searchable(&self, pdf: &[u8]) -> Result<PathBuf, DocumentError> {
        self.scratch.persist_pdf(pdf)
    }

    /// Store recognized text as a scratch file.
    pub fn persist_text(&self, text: &str) -> Result<PathBuf, DocumentError> {
        self.scratch.persist_text(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tool::fake;

    fn extract_with(root: &Path, binaries: EngineBinaries, extraction: ExtractionConfig) -> Extract {
        let paths = PathConfig {
            searchable_pdf_temp: root.join("pdf"),
            text_file_temp: root.join("text"),
        };
        Extract::new(&paths, &extraction, &binaries)
    }

    #[test]
    fn force_ocr_writes_into_scratch() {
        let dir = tempfile::tempdir().unwrap();
        // Writes its own argv into the output file (the last argument).
        let ocrmypdf = fake::script(
            dir.path(),
            "ocrmypdf",
            "for last; do :; done\necho \"%PDF-fake $*\" > \"$last\"",
        );
        let extraction = ExtractionConfig {
            ocrmypdf: OcrMyPdfOptions {
                deskew: Some(true),
                jobs: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let binaries = EngineBinaries { ocrmypdf, ..Default::default() };
        let extract = extract_with(dir.path(), binaries, extraction);

        let out = extract.force_ocr(Path::new("scan.pdf")).unwrap();

        assert_eq!(out.parent().unwrap(), dir.path().join("pdf"));
        assert_eq!(out.extension().unwrap(), "pdf");
        let body = std::fs::read_to_string(&out).unwrap();
        assert!(body.starts_with("%PDF-fake --jobs 2 --deskew scan.pdf"));
    }

    #[test]
    fn force_ocr_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ocrmypdf = fake::script(dir.path(), "ocrmypdf", "echo 'EncryptedPdfError' >&2\nexit 8");
        let binaries = EngineBinaries { ocrmypdf, ..Default::default() };
        let extract = extract_with(dir.path(), binaries, ExtractionConfig::default());

        let err = extract.force_ocr(Path::new("locked.pdf")).unwrap_err();
        assert!(matches!(err, DocumentError::ToolFailed { ref stderr, .. } if stderr == "EncryptedPdfError"));
    }

    #[test]
    fn failed_force_ocr_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let ocrmypdf = fake::script(dir.path(), "ocrmypdf", "exit 8");
        let binaries = EngineBinaries { ocrmypdf, ..Default::default() };
        let extract = extract_with(dir.path(), binaries, ExtractionConfig::default());

        for _ in 0..3 {
            assert!(extract.force_ocr(Path::new("locked.pdf")).is_err());
        }
        let left = std::fs::read_dir(dir.path().join("pdf")).unwrap().count();
        assert_eq!(left, 0);
    }

    #[test]
    fn extract_tables_reads_camelot_exports() {
        let dir = tempfile::tempdir().unwrap();
        let camelot = fake::script(
            dir.path(),
            "camelot",
            r#"flavor=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    stream) flavor="stream"; shift ;;
    *) shift ;;
  esac
done
[ "$flavor" = "stream" ] || exit 3
base="${out%.csv}"
printf '"Item","Qty"\n"Apple","3"\n' > "$base-page-2-table-1.csv"
printf '"Total","7"\n' > "$base-page-1-table-1.csv""#,
        );
        let binaries = EngineBinaries { camelot, ..Default::default() };
        let extract = extract_with(dir.path(), binaries, ExtractionConfig::default());

        let tables = extract.extract_tables(Path::new("report.pdf")).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables.tables[0].page, 1);
        assert_eq!(tables.tables[0].rows, vec![vec!["Total", "7"]]);
        assert_eq!(tables.tables[1].rows[1], vec!["Apple", "3"]);
    }

    #[test]
    fn missing_camelot_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let binaries = EngineBinaries {
            camelot: dir.path().join("no-camelot"),
            ..Default::default()
        };
        let extract = extract_with(dir.path(), binaries, ExtractionConfig::default());
        assert!(matches!(
            extract.extract_tables(Path::new("report.pdf")),
            Err(DocumentError::NotAvailable(_))
        ));
    }

    #[test]
    fn persisted_outputs_land_in_their_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let extract = extract_with(dir.path(), EngineBinaries::default(), ExtractionConfig::default());
        let pdf = extract.persist_searchable(b"%PDF-1.5").unwrap();
        let txt = extract.persist_text("hello").unwrap();
        assert!(pdf.starts_with(dir.path().join("pdf")));
        assert!(txt.starts_with(dir.path().join("text")));
    }
}
