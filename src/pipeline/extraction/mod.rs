pub mod types;
pub mod format;
pub mod prompt;
pub mod parser;
pub mod normalize;
pub mod gemini;
pub mod vision;

pub use types::*;
pub use format::*;
pub use parser::*;
pub use normalize::*;
pub use gemini::*;
pub use vision::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single image's extraction. Never fatal to a batch.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Image could not be read as MIME type + data: {0}")]
    InvalidImageFormat(String),

    #[error("The extraction service returned no text")]
    EmptyServiceResponse,

    #[error("{0}")]
    MalformedResponse(String),

    #[error("Extraction service error: {0}")]
    Service(#[from] ServiceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidImageFormat(_) | Self::Io(_) => FailureKind::InvalidImageFormat,
            Self::EmptyServiceResponse => FailureKind::EmptyServiceResponse,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::Service(_) => FailureKind::ServiceError,
        }
    }
}

/// Serializable tag for `ExtractionError`, carried in per-image outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidImageFormat,
    EmptyServiceResponse,
    MalformedResponse,
    ServiceError,
}

/// Transport or service-side failure. Propagated as-is, never retried.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No API key configured for the extraction service")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Extraction service returned an error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unreadable service envelope: {0}")]
    ResponseParsing(String),
}
