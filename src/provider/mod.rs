//! Provider capability traits and error types.
//!
//! Each generative provider is expressed as a small capability trait so the
//! step adapters and the engine can be exercised with test doubles instead
//! of network access.

pub mod fetch;
pub mod ollama;
pub mod replicate;

pub use fetch::HttpImageFetcher;
pub use ollama::OllamaClient;
pub use replicate::{ReplicateClient, ReplicateDiffusionModel, ReplicateTextModel, ReplicateVisionModel};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Errors that can occur talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Prediction timed out after {waited:?}")]
    Timeout { waited: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A text-completion model: prompt in, full text out.
///
/// Streamed providers concatenate their chunks before returning.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

/// A diffusion image model: prompt in, output image URLs out.
#[async_trait]
pub trait DiffusionModel: Send + Sync {
    async fn predict(&self, prompt: &str) -> ProviderResult<Vec<String>>;
}

/// A vision-captioning model consuming an image file.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(&self, image_path: &Path, instruction: &str) -> ProviderResult<String>;
}

/// Fetches raw image bytes from a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ProviderResult<Vec<u8>>;
}
