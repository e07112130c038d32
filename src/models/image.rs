use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OutpaintError, Result};

/// Pixel dimensions of an image or canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output format requested by the caller. Chosen once per request and
/// immutable afterwards; determines orientation and stitch offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1024x1792")]
    Portrait,
    #[serde(rename = "1792x1024")]
    Landscape,
}

impl ImageFormat {
    pub const SQUARE_SIZE: u32 = 1024;

    /// Parse the wire representation ("1024x1024" etc). Any other string is
    /// rejected; the caller maps that to a 400.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "1024x1024" => Ok(ImageFormat::Square),
            "1024x1792" => Ok(ImageFormat::Portrait),
            "1792x1024" => Ok(ImageFormat::Landscape),
            other => Err(OutpaintError::RequestError(format!(
                "Unsupported format '{}', expected one of 1024x1024, 1024x1792, 1792x1024",
                other
            ))),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        match self {
            ImageFormat::Square => Dimensions::new(1024, 1024),
            ImageFormat::Portrait => Dimensions::new(1024, 1792),
            ImageFormat::Landscape => Dimensions::new(1792, 1024),
        }
    }

    /// The wire string accepted by the provider's `size` parameter.
    pub fn as_size_str(&self) -> &'static str {
        match self {
            ImageFormat::Square => "1024x1024",
            ImageFormat::Portrait => "1024x1792",
            ImageFormat::Landscape => "1792x1024",
        }
    }

    /// Orientation word used when composing edit prompts.
    pub fn orientation(&self) -> &'static str {
        match self {
            ImageFormat::Square => "square",
            ImageFormat::Portrait => "vertical",
            ImageFormat::Landscape => "horizontal",
        }
    }

    /// Which side of the base image gets filled in. Square expands nowhere.
    pub fn fill_side(&self) -> Option<FillSide> {
        match self {
            ImageFormat::Square => None,
            ImageFormat::Portrait => Some(FillSide::Bottom),
            ImageFormat::Landscape => Some(FillSide::Right),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_size_str())
    }
}

/// The half of the target canvas that inpainting fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSide {
    Bottom,
    Right,
}

impl FillSide {
    /// Human wording used in edit prompts ("bottom half", "right half").
    pub fn as_half(&self) -> &'static str {
        match self {
            FillSide::Bottom => "bottom half",
            FillSide::Right => "right half",
        }
    }

    /// Direction the scene continues in, from the base image's point of view.
    pub fn continuation(&self) -> &'static str {
        match self {
            FillSide::Bottom => "downward",
            FillSide::Right => "to the right",
        }
    }
}

/// How the final image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMethod {
    #[serde(rename = "mask-stitch")]
    MaskStitch,
    #[serde(rename = "generation")]
    Generation,
    #[serde(rename = "none")]
    None,
}

/// Inbound body for `POST /api/generate-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    pub complexity: Option<f32>,
    pub format: Option<String>,
}

/// The sole externally observable artifact of an expansion request.
/// Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionResult {
    /// Data URI carrying the PNG bytes.
    pub url: String,
    pub format: ImageFormat,
    #[serde(rename = "requestedDimensions")]
    pub requested_dimensions: Dimensions,
    #[serde(rename = "actualDimensions")]
    pub actual_dimensions: Dimensions,
    #[serde(rename = "isExpanded")]
    pub is_expanded: bool,
    #[serde(rename = "isBase64")]
    pub is_base64: bool,
    #[serde(rename = "editMethod")]
    pub edit_method: EditMethod,
    #[serde(rename = "usedFallback")]
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        assert_eq!(ImageFormat::parse("1024x1024").unwrap(), ImageFormat::Square);
        assert_eq!(ImageFormat::parse("1024x1792").unwrap(), ImageFormat::Portrait);
        assert_eq!(ImageFormat::parse("1792x1024").unwrap(), ImageFormat::Landscape);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(ImageFormat::parse("512x512").is_err());
        assert!(ImageFormat::parse("").is_err());
    }

    #[test]
    fn dimensions_match_format() {
        assert_eq!(ImageFormat::Portrait.dimensions(), Dimensions::new(1024, 1792));
        assert_eq!(ImageFormat::Landscape.dimensions(), Dimensions::new(1792, 1024));
        assert_eq!(ImageFormat::Square.dimensions(), Dimensions::new(1024, 1024));
    }

    #[test]
    fn fill_side_per_format() {
        assert_eq!(ImageFormat::Square.fill_side(), None);
        assert_eq!(ImageFormat::Portrait.fill_side(), Some(FillSide::Bottom));
        assert_eq!(ImageFormat::Landscape.fill_side(), Some(FillSide::Right));
    }

    #[test]
    fn format_serializes_as_size_string() {
        assert_eq!(
            serde_json::to_string(&ImageFormat::Landscape).unwrap(),
            "\"1792x1024\""
        );
    }

    #[test]
    fn edit_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&EditMethod::MaskStitch).unwrap(),
            "\"mask-stitch\""
        );
        assert_eq!(serde_json::to_string(&EditMethod::None).unwrap(), "\"none\"");
    }
}
