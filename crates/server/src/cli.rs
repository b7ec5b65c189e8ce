//! One-shot commands: run a page image or a PDF document through the
//! extraction steps and print the result as JSON.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use scanline_core::{sha256_file_hex, Settings};
use scanline_ocr::{LineMap, OcrEngine, Orientation, PageExtraction, PagePipeline, Step, TesseractCli, WordBox};
use scanline_pdf::{Extract, TableSet};

#[derive(Debug, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub source: PathBuf,
    pub sha256: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub text: String,
    pub lines: LineMap,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordBox>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_pdf: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_file: Option<PathBuf>,
    pub failures: Vec<StepFailure>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct ForceOcrSummary {
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TablesSummary {
    pub source: PathBuf,
    #[serde(flatten)]
    pub tables: TableSet,
}

pub struct ImageOptions {
    pub persist: bool,
    pub words: bool,
}

/// Run one page image through the full pipeline with the configured engine.
pub fn run_image(settings: &Settings, path: &Path, opts: &ImageOptions) -> anyhow::Result<PageSummary> {
    let engine = TesseractCli::new(&settings.engines.tesseract);
    let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);
    process_image(engine, settings, &extract, path, opts)
}

fn process_image<E: OcrEngine>(
    engine: E,
    settings: &Settings,
    extract: &Extract,
    path: &Path,
    opts: &ImageOptions,
) -> anyhow::Result<PageSummary> {
    let start = Instant::now();
    let sha256 = sha256_file_hex(path).with_context(|| format!("reading {}", path.display()))?;

    let pipeline = PagePipeline::new(engine, &settings.tesseract);
    info!(text_flags = %pipeline.text_args(), data_flags = %pipeline.metadata_args(), "engine flags");
    let page = pipeline.run_file(path)?;

    let (searchable_pdf, text_file) = if opts.persist {
        persist(extract, &page)?
    } else {
        (None, None)
    };

    Ok(summarize(path, sha256, page, opts.words, searchable_pdf, text_file, start))
}

fn persist(extract: &Extract, page: &PageExtraction) -> anyhow::Result<(Option<PathBuf>, Option<PathBuf>)> {
    let pdf = match page.searchable_pdf() {
        Some(bytes) => Some(extract.persist_searchable(bytes)?),
        None => None,
    };
    let text = extract.persist_text(page.text())?;
    Ok((pdf, Some(text)))
}

fn summarize(
    path: &Path,
    sha256: String,
    page: PageExtraction,
    include_words: bool,
    searchable_pdf: Option<PathBuf>,
    text_file: Option<PathBuf>,
    start: Instant,
) -> PageSummary {
    let failures = page
        .failures()
        .into_iter()
        .map(|(step, e)| StepFailure { step, error: e.to_string() })
        .collect();
    let orientation = page.orientation.as_ref().and_then(|o| o.as_ref().ok()).cloned();
    let (width, height) = (page.image.width(), page.image.height());
    let (_, text, lines, metadata, _) = page.into_parts();

    PageSummary {
        source: path.to_path_buf(),
        sha256,
        width,
        height,
        orientation,
        text,
        lines,
        word_count: metadata.words().count(),
        mean_confidence: metadata.mean_confidence(),
        words: include_words.then(|| metadata.words().cloned().collect()),
        searchable_pdf,
        text_file,
        failures,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

pub fn run_force_ocr(settings: &Settings, document: &Path) -> anyhow::Result<ForceOcrSummary> {
    let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);
    let output = extract
        .force_ocr(document)
        .with_context(|| format!("force OCR of {}", document.display()))?;
    Ok(ForceOcrSummary { source: document.to_path_buf(), output })
}

pub fn run_tables(settings: &Settings, document: &Path) -> anyhow::Result<TablesSummary> {
    let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);
    let tables = extract
        .extract_tables(document)
        .with_context(|| format!("table extraction from {}", document.display()))?;
    Ok(TablesSummary { source: document.to_path_buf(), tables })
}

/// The effective settings, rendered back as YAML.
pub fn show_config(settings: &Settings) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(settings)?)
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use scanline_core::PathConfig;
    use scanline_ocr::MockEngine;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t8\t6\t-1\t\n\
5\t1\t1\t1\t1\t1\t0\t0\t4\t4\t90\tTotal\n\
5\t1\t1\t1\t1\t2\t4\t0\t4\t4\t70\t12.50\n";

    fn fixture(dir: &Path) -> (Settings, PathBuf) {
        let path = dir.join("receipt.png");
        let img: GrayImage = ImageBuffer::from_fn(8, 6, |x, y| Luma([((x + y) * 20) as u8]));
        DynamicImage::ImageLuma8(img).save(&path).unwrap();

        let mut settings = Settings::default();
        settings.paths = PathConfig {
            searchable_pdf_temp: dir.join("pdf"),
            text_file_temp: dir.join("text"),
        };
        (settings, path)
    }

    fn engine() -> MockEngine {
        MockEngine::new()
            .with_osd("Rotate: 0\nScript: Latin\n")
            .with_text("Total 12.50\n\n")
            .with_data(TSV)
            .with_pdf(b"%PDF-1.5 page".to_vec())
    }

    #[test]
    fn image_summary_reports_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, path) = fixture(dir.path());
        let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);

        let summary = process_image(
            engine(),
            &settings,
            &extract,
            &path,
            &ImageOptions { persist: false, words: true },
        )
        .unwrap();

        assert!(summary.failures.is_empty());
        assert_eq!((summary.width, summary.height), (8, 6));
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.word_count, 2);
        assert_eq!(summary.mean_confidence, Some(80.0));
        assert_eq!(summary.words.as_ref().map(Vec::len), Some(2));
        assert_eq!(summary.sha256, sha256_file_hex(&path).unwrap());
        assert!(summary.searchable_pdf.is_none());
        assert_eq!(summary.orientation.unwrap().script, "latin");
    }

    #[test]
    fn persist_writes_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, path) = fixture(dir.path());
        let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);

        let summary = process_image(
            engine(),
            &settings,
            &extract,
            &path,
            &ImageOptions { persist: true, words: false },
        )
        .unwrap();

        let pdf = summary.searchable_pdf.unwrap();
        assert!(pdf.starts_with(dir.path().join("pdf")));
        assert_eq!(std::fs::read(pdf).unwrap(), b"%PDF-1.5 page");
        let text = summary.text_file.unwrap();
        assert_eq!(std::fs::read_to_string(text).unwrap(), "Total 12.50\n\n");
        assert!(summary.words.is_none());
    }

    #[test]
    fn failed_steps_are_listed_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, path) = fixture(dir.path());
        let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);

        let summary = process_image(
            MockEngine::new().with_text("only text"),
            &settings,
            &extract,
            &path,
            &ImageOptions { persist: false, words: false },
        )
        .unwrap();

        let steps: Vec<Step> = summary.failures.iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![Step::Orientation, Step::Metadata, Step::SearchablePdf]);
        assert_eq!(summary.text, "only text");
        assert_eq!(summary.word_count, 0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failures"][0]["step"], "orientation");
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, _) = fixture(dir.path());
        let extract = Extract::new(&settings.paths, &settings.extraction, &settings.engines);
        let result = process_image(
            engine(),
            &settings,
            &extract,
            &dir.path().join("nope.png"),
            &ImageOptions { persist: false, words: false },
        );
        assert!(result.is_err());
    }

    #[test]
    fn show_config_round_trips() {
        let rendered = show_config(&Settings::default()).unwrap();
        let back: Settings = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(back, Settings::default());
    }
}
