use image::{imageops, DynamicImage, RgbaImage};

use super::RasterImage;
use crate::error::{OutpaintError, Result};
use crate::models::ImageFormat;

/// Composite the base half and the edited half into the target canvas.
///
/// Both inputs must be 1024x1024. The base always sits at the origin; the
/// edited half sits at offset 1024 along the expansion axis: (0, 1024) for
/// portrait, (1024, 0) for landscape. The output canvas is 4-channel even
/// though both inputs are opaque.
///
/// Pure function of its inputs; no provider involvement.
pub fn stitch(
    base: &RasterImage,
    edited: &RasterImage,
    format: ImageFormat,
) -> Result<RasterImage> {
    let side = ImageFormat::SQUARE_SIZE;
    for (name, img) in [("base", base), ("edited", edited)] {
        if img.width() != side || img.height() != side {
            return Err(OutpaintError::EncodingError(format!(
                "{} half must be {}x{}, got {}",
                name,
                side,
                side,
                img.dimensions()
            )));
        }
    }

    let target = format.dimensions();
    let (edited_x, edited_y) = match format {
        ImageFormat::Portrait => (0i64, side as i64),
        ImageFormat::Landscape => (side as i64, 0i64),
        ImageFormat::Square => {
            return Err(OutpaintError::EncodingError(
                "square format has no fill half to stitch".into(),
            ))
        }
    };

    let mut canvas = RgbaImage::new(target.width, target.height);
    let base_rgba = base.to_dynamic()?.to_rgba8();
    let edited_rgba = edited.to_dynamic()?.to_rgba8();
    imageops::overlay(&mut canvas, &base_rgba, 0, 0);
    imageops::overlay(&mut canvas, &edited_rgba, edited_x, edited_y);

    RasterImage::from_dynamic(&DynamicImage::ImageRgba8(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::solid_canvas;

    fn square(rgb: [u8; 3]) -> RasterImage {
        solid_canvas(1024, 1024, rgb).unwrap()
    }

    #[test]
    fn portrait_dimensions_and_layout() {
        let base = square([200, 0, 0]);
        let edited = square([0, 0, 200]);
        let out = stitch(&base, &edited, ImageFormat::Portrait).unwrap();
        assert_eq!(out.width(), 1024);
        assert_eq!(out.height(), 1792);
        assert_eq!(out.channels(), 4);

        let rgba = out.to_dynamic().unwrap().to_rgba8();
        // Base block preserved exactly at the origin.
        assert_eq!(rgba.get_pixel(0, 0).0, [200, 0, 0, 255]);
        assert_eq!(rgba.get_pixel(1023, 1023).0, [200, 0, 0, 255]);
        // Edited half starts at y = 1024.
        assert_eq!(rgba.get_pixel(0, 1024).0, [0, 0, 200, 255]);
        assert_eq!(rgba.get_pixel(1023, 1791).0, [0, 0, 200, 255]);
    }

    #[test]
    fn landscape_dimensions_and_layout() {
        let base = square([10, 250, 10]);
        let edited = square([250, 250, 10]);
        let out = stitch(&base, &edited, ImageFormat::Landscape).unwrap();
        assert_eq!(out.width(), 1792);
        assert_eq!(out.height(), 1024);

        let rgba = out.to_dynamic().unwrap().to_rgba8();
        assert_eq!(rgba.get_pixel(1023, 0).0, [10, 250, 10, 255]);
        assert_eq!(rgba.get_pixel(1024, 0).0, [250, 250, 10, 255]);
        assert_eq!(rgba.get_pixel(1791, 1023).0, [250, 250, 10, 255]);
    }

    #[test]
    fn base_block_is_pixel_exact() {
        let base = square([33, 66, 99]);
        let edited = square([0, 0, 0]);
        let out = stitch(&base, &edited, ImageFormat::Landscape).unwrap();
        let rgba = out.to_dynamic().unwrap().to_rgba8();
        let base_rgba = base.to_dynamic().unwrap().to_rgba8();
        for (x, y) in [(0u32, 0u32), (511, 511), (1023, 0), (0, 1023), (1023, 1023)] {
            assert_eq!(rgba.get_pixel(x, y), base_rgba.get_pixel(x, y));
        }
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let base = square([1, 2, 3]);
        let edited = square([4, 5, 6]);
        let a = stitch(&base, &edited, ImageFormat::Portrait).unwrap();
        let b = stitch(&base, &edited, ImageFormat::Portrait).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn rejects_wrong_sized_halves() {
        let small = solid_canvas(512, 512, [0, 0, 0]).unwrap();
        let base = square([0, 0, 0]);
        assert!(stitch(&base, &small, ImageFormat::Portrait).is_err());
        assert!(stitch(&small, &base, ImageFormat::Landscape).is_err());
    }

    #[test]
    fn rejects_square_format() {
        let base = square([0, 0, 0]);
        assert!(stitch(&base, &base, ImageFormat::Square).is_err());
    }
}
