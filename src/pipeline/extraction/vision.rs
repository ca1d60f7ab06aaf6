//! Extraction client backed by a vision service.
//!
//! Bridges a `VisionClient` (transport) to the `ExtractionClient` boundary the
//! batch orchestrator depends on: encodes the image, requests schema-constrained
//! output, and runs the recovery parser on whatever text comes back.

use std::sync::Arc;

use base64::Engine as _;

use super::parser::parse_stops_response;
use super::prompt::{EXTRACTION_PROMPT, STOPS_RESPONSE_SCHEMA};
use super::types::{ExtractionClient, ImagePayload, VisionClient, VisionRequest};
use super::ExtractionError;
use crate::models::ExtractionResult;

/// Production extraction client: one vision call per image.
pub struct VisionExtractor {
    vision_client: Arc<dyn VisionClient>,
}

impl VisionExtractor {
    pub fn new(vision_client: Arc<dyn VisionClient>) -> Self {
        Self { vision_client }
    }
}

impl ExtractionClient for VisionExtractor {
    fn extract(&self, image: &ImagePayload) -> Result<ExtractionResult, ExtractionError> {
        let _span = tracing::info_span!(
            "extract_stops",
            image = %image.label,
            mime = %image.mime_type,
            image_size = image.data.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
        let request = VisionRequest {
            instruction: EXTRACTION_PROMPT,
            mime_type: &image.mime_type,
            image_base64: &encoded,
            response_schema: &*STOPS_RESPONSE_SCHEMA,
        };

        let text = self
            .vision_client
            .generate_structured(&request)?
            .filter(|t| !t.trim().is_empty())
            .ok_or(ExtractionError::EmptyServiceResponse)?;

        let result = parse_stops_response(&text)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            stops = result.len(),
            "Stop extraction complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::gemini::MockVisionClient;
    use crate::pipeline::extraction::ServiceError;

    fn png() -> ImagePayload {
        ImagePayload {
            label: "route.png".into(),
            mime_type: "image/png".into(),
            data: vec![0x89, 0x50, 0x4E, 0x47],
        }
    }

    #[test]
    fn extracts_stops_from_wrapped_reply() {
        let reply = "Sure!\n```json\n{\"stops\": [{\"stopNumber\": \"5\", \"address\": \"Rua A, 10\", \"cep\": \"01310100\", \"city\": \"SP\"}]}\n```";
        let mock = Arc::new(MockVisionClient::new(reply));
        let extractor = VisionExtractor::new(mock.clone());

        let result = extractor.extract(&png()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.stops[0].cep, "01310100");
        assert_eq!(mock.seen_mime_types(), vec!["image/png".to_string()]);
    }

    #[test]
    fn empty_reply_is_empty_service_response() {
        let extractor = VisionExtractor::new(Arc::new(MockVisionClient::empty()));
        assert!(matches!(
            extractor.extract(&png()),
            Err(ExtractionError::EmptyServiceResponse)
        ));
    }

    #[test]
    fn whitespace_reply_is_empty_service_response() {
        let extractor = VisionExtractor::new(Arc::new(MockVisionClient::new("  \n ")));
        assert!(matches!(
            extractor.extract(&png()),
            Err(ExtractionError::EmptyServiceResponse)
        ));
    }

    #[test]
    fn unreadable_reply_is_malformed() {
        let extractor =
            VisionExtractor::new(Arc::new(MockVisionClient::new("I can't see any stops.")));
        assert!(matches!(
            extractor.extract(&png()),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn service_failure_propagates_unchanged() {
        let extractor =
            VisionExtractor::new(Arc::new(MockVisionClient::failing(429, "quota")));
        match extractor.extract(&png()) {
            Err(ExtractionError::Service(ServiceError::Api { status, message })) => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
