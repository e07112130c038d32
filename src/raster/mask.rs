use image::{DynamicImage, Rgb, RgbImage};

use super::RasterImage;
use crate::error::Result;

/// Outcome of a mask format inspection.
#[derive(Debug, Clone)]
pub struct MaskReport {
    pub valid: bool,
    pub reasons: Vec<String>,
}

/// Build a binary mask: entirely fillable (all white) or entirely protected
/// (all black). The pipeline never needs partial masks — each half of the
/// target canvas is either wholly protected or wholly regenerated.
///
/// The output honors the edit endpoint's contract exactly: 3 grayscale-valued
/// color channels, no alpha, PNG container.
pub fn build_mask(width: u32, height: u32, fill: bool) -> Result<RasterImage> {
    let value = if fill { 255 } else { 0 };
    let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    RasterImage::from_dynamic(&DynamicImage::ImageRgb8(img))
}

/// Inspect a candidate mask against the provider's format requirements:
/// lossless PNG container, 1 or 3 channels, no alpha.
pub fn validate(mask: &RasterImage) -> MaskReport {
    let mut reasons = Vec::new();

    if !mask.is_png() {
        reasons.push("container is not PNG".to_string());
    }
    if !matches!(mask.channels(), 1 | 3) {
        reasons.push(format!(
            "expected 1 or 3 channels, found {}",
            mask.channels()
        ));
    }
    if mask.has_alpha() {
        reasons.push("alpha channel present".to_string());
    }

    MaskReport {
        valid: reasons.is_empty(),
        reasons,
    }
}

/// Re-encode a mask into the required format: grayscale-valued, 3 channels,
/// alpha stripped, lossless PNG.
///
/// Idempotent: repairing an already-valid mask yields an equivalent mask.
/// Called once after building any mask and again when the provider rejects
/// a submission for format reasons.
pub fn repair(mask: &RasterImage) -> Result<RasterImage> {
    // Luma first so RGB(A) input collapses to one gray value per pixel, then
    // back to 3 channels to satisfy the channel-count requirement.
    let gray = mask.to_dynamic()?.to_luma8();
    let rgb = DynamicImage::ImageLuma8(gray).to_rgb8();
    RasterImage::from_dynamic(&DynamicImage::ImageRgb8(rgb))
}
