use serde_json::json;

use super::{classify_provider_error, map_transport_error, materialize, ImagesResponse};
use crate::error::{OutpaintError, Result};
use crate::provider::{GeneratedImage, GenerationRequest};

/// Client for the text-to-image generation endpoint.
#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ImageClient {
    pub fn new(http: reqwest::Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
            model,
        }
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "n": 1,
            "size": request.size,
            "quality": "standard",
            "response_format": "b64_json"
        });

        log::info!(
            "Generating image: model={} size={} prompt_len={}",
            self.model,
            request.size,
            request.prompt.len()
        );

        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let err = classify_provider_error(status, &body);
            log::error!("Image generation failed ({}): {}", status, err);
            return Err(err);
        }

        let parsed: ImagesResponse = serde_json::from_str(&body).map_err(|e| {
            OutpaintError::SerializationError(format!("malformed provider JSON: {}", e))
        })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| OutpaintError::ResponseError("no images generated".into()))?;

        let generated = materialize(&self.http, first).await?;
        log::debug!(
            "Generated image: {} ({} bytes)",
            generated.image.dimensions(),
            generated.image.byte_len()
        );
        Ok(generated)
    }
}
