//! Text and word-metadata recognition over an encoded image.
//!
//! The `try_*` functions distinguish "nothing recognized" (`Ok` with an empty
//! value) from an engine failure. The plain variants keep the best-effort
//! contract: failures are logged and an empty value comes back.

use tracing::warn;

use crate::args::EngineArgs;
use crate::engine::{OcrEngine, OcrError};
use crate::types::WordMetadata;

pub fn try_extract_text<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    args: &EngineArgs,
) -> Result<String, OcrError> {
    engine.image_to_string(image, args)
}

pub fn extract_text<E: OcrEngine + ?Sized>(engine: &E, image: &[u8], args: &EngineArgs) -> String {
    try_extract_text(engine, image, args).unwrap_or_else(|e| {
        warn!(error = %e, args = %args, "text extraction failed");
        String::new()
    })
}

pub fn try_extract_metadata<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    args: &EngineArgs,
) -> Result<WordMetadata, OcrError> {
    let tsv = engine.image_to_data(image, args)?;
    WordMetadata::from_tsv(&tsv)
}

pub fn extract_metadata<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    args: &EngineArgs,
) -> WordMetadata {
    try_extract_metadata(engine, image, args).unwrap_or_else(|e| {
        warn!(error = %e, args = %args, "metadata extraction failed");
        WordMetadata::default()
    })
}
