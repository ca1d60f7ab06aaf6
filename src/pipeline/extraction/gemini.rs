//! Gemini `generateContent` client for schema-constrained image extraction.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{VisionClient, VisionRequest};
use super::ServiceError;
use crate::config::ExtractionConfig;

/// Blocking HTTP client for the Gemini vision API.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request<'a>(&self, request: &'a VisionRequest<'a>) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: request.instruction,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type,
                            data: request.image_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: request.response_schema,
            },
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ServiceError::Network(format!("Cannot reach {}", self.base_url))
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Concatenate the text parts of the first candidate; `None` if there is no text.
fn response_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Prefer the API's own error message over the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl VisionClient for GeminiClient {
    fn generate_structured(
        &self,
        request: &VisionRequest<'_>,
    ) -> Result<Option<String>, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or(ServiceError::NotConfigured)?;
        let body = self.build_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ServiceError::ResponseParsing(e.to_string()))?;

        Ok(response_text(parsed))
    }
}

// ──────────────────────────────────────────────
// MockVisionClient (testing)
// ──────────────────────────────────────────────

/// Mock vision client returning a fixed reply and recording request MIME types.
pub struct MockVisionClient {
    reply: Result<Option<String>, (u16, String)>,
    seen_mime_types: Mutex<Vec<String>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            reply: Ok(Some(response.to_string())),
            seen_mime_types: Mutex::new(Vec::new()),
        }
    }

    /// Call succeeds but carries no text.
    pub fn empty() -> Self {
        Self {
            reply: Ok(None),
            seen_mime_types: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an API error.
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            reply: Err((status, message.to_string())),
            seen_mime_types: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_mime_types(&self) -> Vec<String> {
        self.seen_mime_types
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl VisionClient for MockVisionClient {
    fn generate_structured(
        &self,
        request: &VisionRequest<'_>,
    ) -> Result<Option<String>, ServiceError> {
        if let Ok(mut seen) = self.seen_mime_types.lock() {
            seen.push(request.mime_type.to_string());
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, message)) => Err(ServiceError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}
