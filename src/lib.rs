pub mod config;
pub mod error;
pub mod expand;
pub mod logger;
pub mod models;
pub mod openai;
pub mod provider;
pub mod raster;
#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, OpenAIConfig};
pub use error::{OutpaintError, Result};
pub use expand::Expander;
pub use models::*;
pub use openai::OpenAIClient;
pub use provider::{EditRequest, GeneratedImage, GenerationRequest, ImageProvider};
pub use raster::RasterImage;
