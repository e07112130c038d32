use image::{DynamicImage, Rgb, RgbImage};

use super::RasterImage;
use crate::error::Result;

/// Build an opaque 3-channel canvas filled with a single color.
///
/// The fill half submitted to the edit endpoint is a plain white canvas; the
/// provider paints over whatever the mask marks fillable, so the fill color
/// only matters if the mask is wrong.
pub fn solid_canvas(width: u32, height: u32, rgb: [u8; 3]) -> Result<RasterImage> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    RasterImage::from_dynamic(&DynamicImage::ImageRgb8(img))
}

/// Re-encode a canvas as opaque 3-channel RGB, preserving color.
///
/// The edit endpoint's format complaints don't say whether the image or the
/// mask was refused, so after a format rejection the canvas is normalized
/// alongside the mask repair. Unlike mask repair this keeps full color.
pub fn normalize(canvas: &RasterImage) -> Result<RasterImage> {
    let rgb = canvas.to_dynamic()?.to_rgb8();
    RasterImage::from_dynamic(&DynamicImage::ImageRgb8(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_is_three_channel_opaque() {
        let canvas = solid_canvas(64, 64, [255, 255, 255]).unwrap();
        assert_eq!(canvas.width(), 64);
        assert_eq!(canvas.height(), 64);
        assert_eq!(canvas.channels(), 3);
        assert!(!canvas.has_alpha());
        assert!(canvas.is_png());
    }

    #[test]
    fn canvas_pixels_match_fill_color() {
        let canvas = solid_canvas(8, 8, [12, 34, 56]).unwrap();
        let rgb = canvas.to_dynamic().unwrap().to_rgb8();
        for pixel in rgb.pixels() {
            assert_eq!(pixel.0, [12, 34, 56]);
        }
    }

    #[test]
    fn normalize_strips_alpha_but_keeps_color() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([90, 60, 30, 120]));
        let raster =
            RasterImage::from_dynamic(&DynamicImage::ImageRgba8(rgba)).unwrap();
        let normalized = normalize(&raster).unwrap();
        assert_eq!(normalized.channels(), 3);
        assert!(!normalized.has_alpha());
        let rgb = normalized.to_dynamic().unwrap().to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [90, 60, 30]);
    }
}
