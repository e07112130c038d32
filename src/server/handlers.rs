use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

use super::AppState;
use crate::error::{OutpaintError, Result};
use crate::models::{GenerateImageRequest, ImageFormat};

pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Outpaint API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            { "path": "/", "method": "GET", "description": "Service info" },
            { "path": "/api/health", "method": "GET", "description": "Health check" },
            { "path": "/api/generate-image", "method": "POST", "description": "Generate and expand an image" }
        ]
    }))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "provider": "configured"
    }))
}

/// Pull the validated prompt and format out of the request body.
/// Rejected here means rejected before any provider call.
fn parse_request(body: &GenerateImageRequest) -> Result<(String, ImageFormat)> {
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        return Err(OutpaintError::RequestError("Prompt is required".into()));
    }

    let format = match body.format.as_deref() {
        None => ImageFormat::Square,
        Some(s) => ImageFormat::parse(s)?,
    };

    Ok((prompt.to_string(), format))
}

pub async fn generate_image(
    state: web::Data<AppState>,
    body: web::Json<GenerateImageRequest>,
) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let (prompt, format) = match parse_request(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("[req:{}] Rejected request: {}", request_id, e);
            return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
        }
    };

    log::info!(
        "[req:{}] Expansion requested: format={} complexity={:?} prompt_len={}",
        request_id,
        format,
        body.complexity,
        prompt.len()
    );

    match state.expander.expand(&prompt, body.complexity, format).await {
        Ok(result) => {
            log::info!(
                "[req:{}] Completed in {}ms: expanded={} method={:?}",
                request_id,
                started.elapsed().as_millis(),
                result.is_expanded,
                result.edit_method
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            // Only base-generation failures reach this branch; everything
            // else degrades to an Ok result inside the pipeline.
            log::error!(
                "[req:{}] Failed after {}ms: {}",
                request_id,
                started.elapsed().as_millis(),
                e
            );
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}
