use std::path::Path;

use image::DynamicImage;
use serde::Serialize;
use tracing::{info, warn};

use scanline_core::{OrientationConfig, TesseractSettings};

use crate::args::{self, EngineArgs};
use crate::codec;
use crate::engine::{OcrEngine, OcrError};
use crate::orientation;
use crate::recognize;
use crate::searchable;
use crate::structure;
use crate::types::{LineMap, Orientation, WordMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Orientation,
    Text,
    Metadata,
    SearchablePdf,
}

/// Everything produced for one page image. Each step keeps its own outcome;
/// a failed step never prevents the later ones from running.
#[derive(Debug)]
pub struct PageExtraction {
    /// Orientation-corrected image, or the input if correction was skipped
    /// or failed.
    pub image: DynamicImage,
    /// `None` when orientation correction is disabled.
    pub orientation: Option<Result<Orientation, OcrError>>,
    pub text: Result<String, OcrError>,
    pub lines: LineMap,
    pub metadata: Result<WordMetadata, OcrError>,
    pub searchable_pdf: Result<Vec<u8>, OcrError>,
}

impl PageExtraction {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn metadata(&self) -> Option<&WordMetadata> {
        self.metadata.as_ref().ok()
    }

    pub fn searchable_pdf(&self) -> Option<&[u8]> {
        self.searchable_pdf.as_deref().ok()
    }

    pub fn failures(&self) -> Vec<(Step, &OcrError)> {
        let mut out = Vec::new();
        if let Some(Err(e)) = &self.orientation {
            out.push((Step::Orientation, e));
        }
        if let Err(e) = &self.text {
            out.push((Step::Text, e));
        }
        if let Err(e) = &self.metadata {
            out.push((Step::Metadata, e));
        }
        if let Err(e) = &self.searchable_pdf {
            out.push((Step::SearchablePdf, e));
        }
        out
    }

    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }

    /// The best-effort view: corrected image, text, line map, word metadata
    /// and searchable PDF, with failed steps replaced by empty values.
    pub fn into_parts(self) -> (DynamicImage, String, LineMap, WordMetadata, Option<Vec<u8>>) {
        (
            self.image,
            self.text.unwrap_or_default(),
            self.lines,
            self.metadata.unwrap_or_default(),
            self.searchable_pdf.ok(),
        )
    }
}

/// Orchestrates: orientation → text → line map → word metadata → searchable PDF.
///
/// Engine flags are derived once at construction and reused for every page.
pub struct PagePipeline<E: OcrEngine> {
    engine: E,
    text_args: EngineArgs,
    metadata_args: EngineArgs,
    osd: OrientationConfig,
    correct_osd: bool,
}

impl<E: OcrEngine> PagePipeline<E> {
    pub fn new(engine: E, settings: &TesseractSettings) -> Self {
        Self {
            engine,
            text_args: args::text_args(&settings.config_string),
            metadata_args: args::metadata_args(&settings.config_data),
            osd: settings.config_osd.clone(),
            correct_osd: settings.config_string.correct_osd,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn text_args(&self) -> &EngineArgs {
        &self.text_args
    }

    pub fn metadata_args(&self) -> &EngineArgs {
        &self.metadata_args
    }

    /// Decode `path` and run the page pipeline over it.
    pub fn run_file(&self, path: &Path) -> Result<PageExtraction, OcrError> {
        let image = codec::load_image(path)?;
        Ok(self.run(image, path))
    }

    /// Run every step over `image`. The searchable PDF is rendered from the
    /// file at `image_path` rather than the corrected image.
    pub fn run(&self, image: DynamicImage, image_path: &Path) -> PageExtraction {
        // 1. Orientation.
        let (image, orientation) = if self.correct_osd {
            let (image, outcome) = orientation::correct(&self.engine, image, &self.osd);
            (image, Some(outcome))
        } else {
            (image, None)
        };

        // 2–4. Text, line map, word metadata over the corrected image.
        let png = codec::encode_png(&image).map_err(|e| match e {
            OcrError::ImageEncode(msg) => msg,
            other => other.to_string(),
        });
        let text = match &png {
            Ok(bytes) => recognize::try_extract_text(&self.engine, bytes, &self.text_args),
            Err(msg) => Err(OcrError::ImageEncode(msg.clone())),
        };
        let lines = structure::structure_lines(text.as_deref().unwrap_or(""));
        let metadata = match &png {
            Ok(bytes) => recognize::try_extract_metadata(&self.engine, bytes, &self.metadata_args),
            Err(msg) => Err(OcrError::ImageEncode(msg.clone())),
        };

        // 5. Searchable PDF from the original file.
        let searchable_pdf = std::fs::read(image_path)
            .map_err(OcrError::from)
            .and_then(|bytes| searchable::try_searchable_pdf(&self.engine, &bytes, &self.text_args));

        let page = PageExtraction {
            image,
            orientation,
            text,
            lines,
            metadata,
            searchable_pdf,
        };

        for (step, e) in page.failures() {
            warn!(path = %image_path.display(), ?step, error = %e, "page step failed");
        }
        info!(
            path = %image_path.display(),
            lines = page.lines.len(),
            failed_steps = page.failures().len(),
            "page processed"
        );
        page
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
