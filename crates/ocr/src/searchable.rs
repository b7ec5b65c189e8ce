use tracing::warn;

use crate::args::EngineArgs;
use crate::engine::{OcrEngine, OcrError};

/// Render `image` as a single-page PDF carrying an invisible text layer.
pub fn try_searchable_pdf<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    args: &EngineArgs,
) -> Result<Vec<u8>, OcrError> {
    let pdf = engine.image_to_pdf(image, args)?;
    if !pdf.starts_with(b"%PDF") {
        return Err(OcrError::Parse(format!(
            "searchable output is not a PDF ({} bytes)",
            pdf.len()
        )));
    }
    Ok(pdf)
}

/// Best-effort variant: `None` means the PDF could not be produced.
pub fn searchable_pdf<E: OcrEngine + ?Sized>(
    engine: &E,
    image: &[u8],
    args: &EngineArgs,
) -> Option<Vec<u8>> {
    match try_searchable_pdf(engine, image, args) {
        Ok(pdf) => Some(pdf),
        Err(e) => {
            warn!(error = %e, "searchable PDF generation failed");
            None
        }
    }
}
