//! Error types for Clausewise.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Source bytes could not be parsed as the declared format, or held no text.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Neither a document nor question text survived input resolution.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Even the smallest fallback excerpt was rejected by the generation service.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Any other generation-service failure (outage, auth, malformed reply).
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure was caused by what the caller sent.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Extraction(_) | Error::EmptyInput(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
