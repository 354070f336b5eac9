//! Error types for Driftloop
//!
//! Centralized error handling using thiserror. Provider-level faults live in
//! [`crate::provider::ProviderError`]; adapters convert those into step
//! results rather than propagating them here.

use thiserror::Error;

/// All error types that can occur in Driftloop
#[derive(Debug, Error)]
pub enum DriftloopError {
    /// Invalid or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Artifact store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Driftloop operations
pub type Result<T> = std::result::Result<T, DriftloopError>;
