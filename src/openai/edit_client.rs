use reqwest::multipart::{Form, Part};

use super::{classify_provider_error, map_transport_error, materialize, ImagesResponse};
use crate::error::{OutpaintError, Result};
use crate::provider::{EditRequest, GeneratedImage};

/// Client for the inpainting ("edit") endpoint.
///
/// One call = one submission. Retry, backoff, prompt softening and mask
/// repair are the orchestrator's job; this client only classifies failures
/// precisely enough for the orchestrator to pick a recovery action.
#[derive(Clone)]
pub struct EditClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl EditClient {
    pub fn new(http: reqwest::Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
            model,
        }
    }

    pub async fn edit(&self, request: EditRequest) -> Result<GeneratedImage> {
        request.check_dimensions()?;

        log::info!(
            "Submitting edit: model={} size={} canvas={}B mask={}B mask_channels={} mask_alpha={}",
            self.model,
            request.size,
            request.canvas.byte_len(),
            request.mask.byte_len(),
            request.mask.channels(),
            request.mask.has_alpha()
        );

        let image_part = Part::bytes(request.canvas.as_bytes().to_vec())
            .file_name("canvas.png")
            .mime_str("image/png")
            .map_err(|e| OutpaintError::RequestError(format!("invalid image part: {}", e)))?;
        let mask_part = Part::bytes(request.mask.as_bytes().to_vec())
            .file_name("mask.png")
            .mime_str("image/png")
            .map_err(|e| OutpaintError::RequestError(format!("invalid mask part: {}", e)))?;

        let form = Form::new()
            .part("image", image_part)
            .part("mask", mask_part)
            .text("prompt", request.prompt.clone())
            .text("n", request.count.to_string())
            .text("size", request.size.to_string())
            .text("model", self.model.clone())
            .text("response_format", "b64_json");

        let response = self
            .http
            .post(format!("{}/images/edits", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let err = classify_provider_error(status, &body);
            log::warn!("Edit rejected ({}): {}", status, err);
            return Err(err);
        }

        let parsed: ImagesResponse = serde_json::from_str(&body).map_err(|e| {
            OutpaintError::SerializationError(format!("malformed provider JSON: {}", e))
        })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| OutpaintError::ResponseError("edit returned no images".into()))?;

        let edited = materialize(&self.http, first).await?;
        log::debug!(
            "Edit complete: {} ({} bytes)",
            edited.image.dimensions(),
            edited.image.byte_len()
        );
        Ok(edited)
    }
}
