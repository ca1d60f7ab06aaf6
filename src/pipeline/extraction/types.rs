use std::path::PathBuf;

use super::{ExtractionError, ServiceError};
use crate::models::ExtractionResult;

/// One decoded image, ready to send to the extraction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Human-readable identity used in logs and per-image outcomes.
    pub label: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Where an image comes from. Decoding into an `ImagePayload` is deferred
/// until the image's turn in the batch so a bad input only fails itself.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Local file; MIME type detected from content, then extension.
    Path(PathBuf),
    /// `data:<mime>;base64,<payload>` URL, as produced by file pickers.
    DataUrl { label: String, url: String },
    /// Raw bytes with an optional declared MIME type.
    Bytes {
        label: String,
        data: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl ImageSource {
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::DataUrl { label, .. } | Self::Bytes { label, .. } => label.clone(),
        }
    }
}

/// One structured-output request to a vision service.
#[derive(Debug, Clone)]
pub struct VisionRequest<'a> {
    pub instruction: &'a str,
    pub mime_type: &'a str,
    /// Base64-encoded image bytes.
    pub image_base64: &'a str,
    /// JSON schema the service is asked to constrain its output to.
    pub response_schema: &'a serde_json::Value,
}

/// Transport abstraction over the vision service (allows mocking).
///
/// `Ok(None)` means the call succeeded but carried no text.
pub trait VisionClient: Send + Sync {
    fn generate_structured(
        &self,
        request: &VisionRequest<'_>,
    ) -> Result<Option<String>, ServiceError>;
}

/// Per-image extraction boundary used by the batch orchestrator.
pub trait ExtractionClient: Send + Sync {
    fn extract(&self, image: &ImagePayload) -> Result<ExtractionResult, ExtractionError>;
}
