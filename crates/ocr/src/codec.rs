use std::io::Cursor;
use std::path::Path;

use image::DynamicImage;

use crate::engine::OcrError;

/// Decode an image file from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage, OcrError> {
    image::open(path).map_err(|e| OcrError::ImageDecode(format!("{}: {e}", path.display())))
}

/// Encode as PNG for handing to the engine.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
    Ok(buf)
}
