pub mod edit_client;
pub mod image_client;

pub use edit_client::EditClient;
pub use image_client::ImageClient;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::OpenAIConfig;
use crate::error::{OutpaintError, Result};
use crate::provider::{EditRequest, GeneratedImage, GenerationRequest, ImageProvider};
use crate::raster::RasterImage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GENERATION_MODEL: &str = "dall-e-3";
const DEFAULT_EDIT_MODEL: &str = "dall-e-2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the provider's image endpoints, aggregating the generation
/// client and the inpainting (edit) client over one shared HTTP client.
#[derive(Clone)]
pub struct OpenAIClient {
    image_client: ImageClient,
    edit_client: EditClient,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| OutpaintError::ConfigError("OpenAI API key is required".into()))?;
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let generation_model = config
            .generation_model
            .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string());
        let edit_model = config
            .edit_model
            .unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_string());

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| OutpaintError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            image_client: ImageClient::new(
                http.clone(),
                api_key.clone(),
                base_url.clone(),
                generation_model,
            ),
            edit_client: EditClient::new(http, api_key, base_url, edit_model),
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn edits(&self) -> &EditClient {
        &self.edit_client
    }
}

#[async_trait]
impl ImageProvider for OpenAIClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage> {
        self.image_client.generate(request).await
    }

    async fn edit(&self, request: EditRequest) -> Result<GeneratedImage> {
        self.edit_client.edit(request).await
    }
}

/// Wire shape shared by the generations and edits endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ImagesResponse {
    pub data: Vec<ImagePayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagePayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

/// Normalize the provider's dual response shape (download URL vs embedded
/// base64) into a decoded [`RasterImage`] immediately, so nothing downstream
/// branches on transport representation.
pub(crate) async fn materialize(
    http: &reqwest::Client,
    payload: ImagePayload,
) -> Result<GeneratedImage> {
    let image = if let Some(b64) = payload.b64_json {
        RasterImage::from_base64(&b64)?
    } else if let Some(url) = payload.url {
        let bytes = http
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?
            .bytes()
            .await
            .map_err(map_transport_error)?;
        RasterImage::from_png_bytes(bytes.to_vec())?
    } else {
        return Err(OutpaintError::ResponseError(
            "image payload carries neither url nor b64_json".into(),
        ));
    };

    Ok(GeneratedImage {
        image,
        revised_prompt: payload.revised_prompt,
    })
}

pub(crate) fn map_transport_error(e: reqwest::Error) -> OutpaintError {
    if e.is_timeout() {
        OutpaintError::NetworkTimeout(e.to_string())
    } else {
        OutpaintError::RequestError(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize, Default)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Classify a non-2xx provider response into the retry taxonomy. Content
/// policy and mask-format rejections get their own variants because they
/// drive different recovery actions (prompt softening vs mask repair).
pub(crate) fn classify_provider_error(status: reqwest::StatusCode, body: &str) -> OutpaintError {
    let detail = serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_default();
    let message = detail
        .message
        .unwrap_or_else(|| format!("provider returned {}", status));
    let haystack = format!(
        "{} {} {}",
        message,
        detail.kind.as_deref().unwrap_or(""),
        detail.code.as_deref().unwrap_or("")
    )
    .to_lowercase();

    if haystack.contains("content_policy")
        || haystack.contains("content policy")
        || haystack.contains("safety system")
    {
        OutpaintError::ContentPolicyRejected(message)
    } else if haystack.contains("mask")
        || haystack.contains("alpha")
        || haystack.contains("channels")
        || haystack.contains("grayscale")
    {
        OutpaintError::MaskFormatInvalid(message)
    } else {
        OutpaintError::ResponseError(format!("provider returned {}: {}", status, message))
    }
}
