use std::sync::OnceLock;

use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use regex::Regex;
use tracing::{debug, warn};

use scanline_core::OrientationConfig;

use crate::codec;
use crate::engine::{OcrEngine, OcrError};
use crate::types::Orientation;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_rotate, r"rotate: (\d+)");
re!(re_script, r"script: ([a-z]+)");

/// Pull the rotation and script out of an orientation report.
pub fn parse_osd(report: &str) -> Result<Orientation, OcrError> {
    let report = report.to_lowercase();
    let rotate: u32 = re_rotate()
        .captures(&report)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| OcrError::Osd("no rotation in report".to_string()))?;
    let script = re_script()
        .captures(&report)
        .map(|c| c[1].to_string())
        .ok_or_else(|| OcrError::Osd("no script in report".to_string()))?;

    Ok(Orientation {
        angle: 360.0 - rotate as f32,
        script,
    })
}

/// Run the engine's orientation pass over `image`.
pub fn detect<E: OcrEngine + ?Sized>(engine: &E, image: &DynamicImage) -> Result<Orientation, OcrError> {
    let png = codec::encode_png(image)?;
    let report = engine.osd(&png)?;
    parse_osd(&report)
}

/// Rotate `image` counter-clockwise by `angle` degrees about the configured
/// centre (image centre by default), scaling by `cfg.scale`. The canvas keeps
/// its size; uncovered pixels are black.
pub fn rotate(image: &DynamicImage, angle: f32, cfg: &OrientationConfig) -> DynamicImage {
    if angle.rem_euclid(360.0) == 0.0 && cfg.scale == 1.0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let [cx, cy] = cfg.center.unwrap_or([w as f32 / 2.0, h as f32 / 2.0]);
    // Image y grows downward, so a counter-clockwise turn is a negative
    // clockwise projection.
    let projection = Projection::translate(cx, cy)
        * Projection::rotate(-angle.to_radians())
        * Projection::scale(cfg.scale, cfg.scale)
        * Projection::translate(-cx, -cy);
    // Bilinear sampling needs both neighbours in bounds, so the last row and
    // column would read as border. Warp on a canvas padded with one border
    // pixel per side, in padded coordinates, and crop back.
    let padded = Projection::translate(1.0, 1.0) * projection * Projection::translate(-1.0, -1.0);

    match image {
        DynamicImage::ImageLuma8(buf) => {
            let black = Luma([0]);
            let warped = warp(&pad(buf, black), &padded, Interpolation::Bilinear, black);
            DynamicImage::ImageLuma8(unpad(&warped, w, h))
        }
        DynamicImage::ImageRgb8(buf) => {
            let black = Rgb([0, 0, 0]);
            let warped = warp(&pad(buf, black), &padded, Interpolation::Bilinear, black);
            DynamicImage::ImageRgb8(unpad(&warped, w, h))
        }
        other => {
            let black = Rgba([0, 0, 0, 255]);
            let warped = warp(&pad(&other.to_rgba8(), black), &padded, Interpolation::Bilinear, black);
            DynamicImage::ImageRgba8(unpad(&warped, w, h))
        }
    }
}

fn pad<P: Pixel + 'static>(buf: &ImageBuffer<P, Vec<P::Subpixel>>, border: P) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mut out = ImageBuffer::from_pixel(buf.width() + 2, buf.height() + 2, border);
    imageops::replace(&mut out, buf, 1, 1);
    out
}

fn unpad<P: Pixel + 'static>(buf: &ImageBuffer<P, Vec<P::Subpixel>>, w: u32, h: u32) -> ImageBuffer<P, Vec<P::Subpixel>> {
    imageops::crop_imm(buf, 1, 1, w, h).to_image()
}

/// Detect and undo page rotation.
///
/// Never fails: when detection or parsing goes wrong the failure is logged and
/// the input image is handed back untouched alongside the error.
pub fn correct<E: OcrEngine + ?Sized>(
    engine: &E,
    image: DynamicImage,
    cfg: &OrientationConfig,
) -> (DynamicImage, Result<Orientation, OcrError>) {
    match detect(engine, &image) {
        Ok(orientation) => {
            debug!(angle = orientation.angle, script = %orientation.script, "correcting orientation");
            let rotated = rotate(&image, orientation.angle, cfg);
            (rotated, Ok(orientation))
        }
        Err(e) => {
            warn!(error = %e, "orientation correction skipped");
            (image, Err(e))
        }
    }
}
