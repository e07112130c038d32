use thiserror::Error;

/// Error taxonomy for the expansion pipeline.
///
/// Only `BaseGenerationFailed` (and malformed requests, rejected before the
/// pipeline starts) ever surface as HTTP errors. Every other variant is
/// absorbed by the orchestrator and drives a state transition: retry,
/// repair, fallback, or the degraded return-original-square path.
#[derive(Debug, Error)]
pub enum OutpaintError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Image encoding error: {0}")]
    EncodingError(String),

    #[error("Base image generation failed: {0}")]
    BaseGenerationFailed(String),

    #[error("Mask format rejected by provider: {0}")]
    MaskFormatInvalid(String),

    #[error("Prompt rejected by content policy: {0}")]
    ContentPolicyRejected(String),

    #[error("Edit retries exhausted after {attempts} attempts: {message}")]
    EditExhaustedRetries { attempts: u32, message: String },

    #[error("Fallback generation failed: {0}")]
    FallbackGenerationFailed(String),

    #[error("Provider call timed out: {0}")]
    NetworkTimeout(String),
}

impl OutpaintError {
    /// Whether an edit attempt that failed with this error may be retried
    /// (after the mutation it calls for: prompt softening or mask repair).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OutpaintError::MaskFormatInvalid(_)
                | OutpaintError::ContentPolicyRejected(_)
                | OutpaintError::NetworkTimeout(_)
                | OutpaintError::RequestError(_)
                | OutpaintError::ResponseError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OutpaintError>;
