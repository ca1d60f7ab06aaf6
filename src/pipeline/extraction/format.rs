//! Image payload decomposition: source → (MIME type, bytes).
//!
//! Magic bytes are trusted over declared extensions. The extension is only
//! consulted when the header is not recognized.

use std::path::Path;

use base64::Engine as _;

use super::types::{ImagePayload, ImageSource};
use super::ExtractionError;

/// Inline image limit of the extraction service (20 MB).
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

impl ImageSource {
    /// Decode this source into a payload the extraction client can send.
    pub fn load(&self) -> Result<ImagePayload, ExtractionError> {
        let label = self.label();
        let (mime_type, data) = match self {
            Self::Path(path) => {
                let data = std::fs::read(path)?;
                let mime = detect_image_mime(&data)
                    .map(str::to_string)
                    .or_else(|| mime_from_extension(path))
                    .ok_or_else(|| {
                        ExtractionError::InvalidImageFormat(format!(
                            "{label} is not a recognized image"
                        ))
                    })?;
                (mime, data)
            }
            Self::DataUrl { url, .. } => decode_data_url(url)?,
            Self::Bytes {
                data, mime_type, ..
            } => {
                let mime = match mime_type {
                    Some(declared) => declared.trim().to_ascii_lowercase(),
                    None => detect_image_mime(data)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            ExtractionError::InvalidImageFormat(format!(
                                "{label} is not a recognized image"
                            ))
                        })?,
                };
                (mime, data.clone())
            }
        };

        validate_payload(&mime_type, &data)?;

        Ok(ImagePayload {
            label,
            mime_type,
            data,
        })
    }
}

/// Split a `data:<mime>;base64,<payload>` URL into MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), ExtractionError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| ExtractionError::InvalidImageFormat("missing data: prefix".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExtractionError::InvalidImageFormat("missing payload separator".into()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ExtractionError::InvalidImageFormat("payload is not base64".into()))?
        .trim()
        .to_ascii_lowercase();

    if mime.is_empty() {
        return Err(ExtractionError::InvalidImageFormat("missing MIME type".into()));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ExtractionError::InvalidImageFormat(format!("bad base64 payload: {e}")))?;

    Ok((mime, data))
}

/// Detect an image MIME type from its leading bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some("image/tiff"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => match &bytes[8..12] {
            b"heic" | b"heix" | b"hevc" | b"hevx" => Some("image/heic"),
            b"mif1" | b"msf1" => Some("image/heif"),
            _ => None,
        },
        _ => None,
    }
}

fn mime_from_extension(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .map(|m| m.essence_str().to_string())
}

fn validate_payload(mime_type: &str, data: &[u8]) -> Result<(), ExtractionError> {
    if !mime_type.starts_with("image/") {
        return Err(ExtractionError::InvalidImageFormat(format!(
            "unsupported MIME type {mime_type}"
        )));
    }
    if data.is_empty() {
        return Err(ExtractionError::InvalidImageFormat("image has no data".into()));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::InvalidImageFormat(format!(
            "image too large ({} bytes), maximum is 20 MB",
            data.len()
        )));
    }
    Ok(())
}
