use async_trait::async_trait;

use crate::error::{OutpaintError, Result};
use crate::models::Dimensions;
use crate::raster::RasterImage;

/// Provider output, normalized at the boundary: whether the provider
/// answered with a download URL or embedded base64 bytes, callers only ever
/// see a decoded [`RasterImage`] plus the provider's rewritten prompt.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image: RasterImage,
    pub revised_prompt: Option<String>,
}

/// One generation call: a text prompt rendered at a fixed size.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: size.into(),
        }
    }
}

/// One inpainting call: canvas + mask + prompt, always a single 1024x1024
/// output. Owned by the edit client for the duration of the call.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub canvas: RasterImage,
    pub mask: RasterImage,
    pub prompt: String,
    pub count: u8,
    pub size: Dimensions,
}

impl EditRequest {
    pub fn new(canvas: RasterImage, mask: RasterImage, prompt: impl Into<String>) -> Self {
        let size = canvas.dimensions();
        Self {
            canvas,
            mask,
            prompt: prompt.into(),
            count: 1,
            size,
        }
    }

    /// Canvas and mask must share identical dimensions.
    pub fn check_dimensions(&self) -> Result<()> {
        if self.canvas.dimensions() != self.mask.dimensions() {
            return Err(OutpaintError::RequestError(format!(
                "canvas {} and mask {} dimensions differ",
                self.canvas.dimensions(),
                self.mask.dimensions()
            )));
        }
        Ok(())
    }
}

/// Seam between the expansion pipeline and the external image provider.
/// The production implementation is [`crate::openai::OpenAIClient`]; tests
/// inject fakes with scripted failures.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Text-to-image generation at the requested size.
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage>;

    /// Inpainting: regenerate the mask's fillable region of the canvas.
    async fn edit(&self, request: EditRequest) -> Result<GeneratedImage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{build_mask, solid_canvas};

    #[test]
    fn edit_request_dimension_check() {
        let canvas = solid_canvas(64, 64, [255, 255, 255]).unwrap();
        let mask = build_mask(64, 64, true).unwrap();
        assert!(EditRequest::new(canvas.clone(), mask, "x").check_dimensions().is_ok());

        let mismatched = build_mask(32, 64, true).unwrap();
        assert!(EditRequest::new(canvas, mismatched, "x")
            .check_dimensions()
            .is_err());
    }
}
