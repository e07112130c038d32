pub mod canvas;
pub mod mask;
pub mod stitch;

pub use canvas::{normalize, solid_canvas};
pub use mask::{build_mask, repair, validate, MaskReport};
pub use stitch::stitch;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;

use crate::error::{OutpaintError, Result};
use crate::models::Dimensions;

/// Upper bound on decoded provider payloads. Anything larger than this is
/// not a plausible 1024-class PNG and gets rejected before decoding.
const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

/// An in-memory bitmap: PNG-encoded bytes plus the metadata the pipeline
/// branches on (dimensions, channel count, alpha presence).
///
/// Everything the pipeline touches — provider output, canvases, masks,
/// stitched composites — is held as one of these; nothing is ever written
/// to disk.
#[derive(Debug, Clone)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: u8,
    has_alpha: bool,
    bytes: Vec<u8>,
}

impl RasterImage {
    /// Wrap already-encoded PNG bytes, decoding once to capture metadata.
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(OutpaintError::EncodingError("empty image payload".into()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(OutpaintError::EncodingError(format!(
                "image payload too large: {} bytes (max {})",
                bytes.len(),
                MAX_IMAGE_BYTES
            )));
        }
        let img = image::load_from_memory(&bytes)
            .map_err(|e| OutpaintError::EncodingError(format!("failed to decode image: {}", e)))?;
        let color = img.color();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            channels: color.channel_count(),
            has_alpha: color.has_alpha(),
            bytes,
        })
    }

    /// Decode a base64 payload (provider `b64_json` field) into an image.
    pub fn from_base64(b64: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(b64)
            .map_err(|e| OutpaintError::EncodingError(format!("invalid base64 image: {}", e)))?;
        Self::from_png_bytes(bytes)
    }

    /// Encode a decoded bitmap back into the lossless PNG container.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| OutpaintError::EncodingError(format!("failed to encode PNG: {}", e)))?;
        let color = img.color();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            channels: color.channel_count(),
            has_alpha: color.has_alpha(),
            bytes: buffer.into_inner(),
        })
    }

    /// Decode into a bitmap for pixel-level work.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        image::load_from_memory(&self.bytes)
            .map_err(|e| OutpaintError::EncodingError(format!("failed to decode image: {}", e)))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Encoded size in bytes; logged at each state transition.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Render as a `data:image/png;base64,…` URI for the response body.
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.bytes))
    }

    /// True when the encoded container is PNG (checked by magic bytes).
    pub fn is_png(&self) -> bool {
        self.bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47])
    }
}
