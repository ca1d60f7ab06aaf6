//! Recovery of a JSON object from free-text service output.
//!
//! Vision models regularly wrap a valid payload in commentary or Markdown
//! fences even when asked for structured output. Candidates are tried in
//! order and the first one that parses wins:
//! 1. interior of a ```json fence
//! 2. interior of a bare ``` fence
//! 3. the whole text
//! 4. first `{` through last `}`

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::ExtractionError;
use crate::models::{ExtractionResult, RawStop};

/// Shown to the end consumer; the underlying parse error only goes to the log.
pub const MALFORMED_RESPONSE_MESSAGE: &str =
    "The extraction service answered, but its reply could not be read as a list of stops.";

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n?(.*?)```").expect("valid regex"));

static BARE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*\r?\n(.*?)```").expect("valid regex"));

/// Recover the structured object carried by a service response.
pub fn recover_json(response: &str) -> Result<Value, ExtractionError> {
    let mut last_error = None;

    for candidate in fenced_candidates(response) {
        match parse_container(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    if let Some(braced) = brace_span(response) {
        match parse_container(braced) {
            Ok(value) => {
                tracing::debug!("Recovered JSON from brace span");
                return Ok(value);
            }
            Err(e) => last_error = Some(e),
        }
    }

    tracing::warn!(
        error = last_error.as_deref().unwrap_or("no JSON candidate found"),
        response_len = response.len(),
        "Could not recover JSON from extraction response"
    );
    Err(ExtractionError::MalformedResponse(
        MALFORMED_RESPONSE_MESSAGE.to_string(),
    ))
}

/// Recover the response and read its `stops` array into raw candidates.
///
/// A top-level array is taken as the stops list. An object without `stops`
/// yields no candidates. Array items that are not objects are skipped.
pub fn parse_stops_response(response: &str) -> Result<ExtractionResult, ExtractionError> {
    let value = recover_json(response)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("stops") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let total = items.len();
    let stops: Vec<RawStop> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();

    if stops.len() < total {
        tracing::debug!(
            kept = stops.len(),
            skipped = total - stops.len(),
            "Skipped non-object stop items"
        );
    }

    Ok(ExtractionResult { stops })
}

/// Steps 1-3, in priority order.
fn fenced_candidates(response: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(inner) = JSON_FENCE_RE.captures(response).and_then(|c| c.get(1)) {
        candidates.push(inner.as_str());
    }
    if let Some(inner) = BARE_FENCE_RE.captures(response).and_then(|c| c.get(1)) {
        candidates.push(inner.as_str());
    }
    candidates.push(response);
    candidates
}

fn brace_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Parse a candidate, accepting only objects and arrays.
fn parse_container(candidate: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(candidate.trim()).map_err(|e| e.to_string())?;
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err("JSON is not an object or array".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "stops": [
                {"stopNumber": "1", "address": "Rua A, 10", "cep": "01310100", "city": "SP"},
                {"stopNumber": "2", "address": "Rua B, 20", "cep": "", "city": "SP"}
            ]
        })
    }

    #[test]
    fn recovers_from_json_fence() {
        let text = format!("```json\n{}\n```", serde_json::to_string_pretty(&sample()).unwrap());
        assert_eq!(recover_json(&text).unwrap(), sample());
    }

    #[test]
    fn recovers_from_uppercase_json_fence_on_one_line() {
        let text = format!("```JSON{}```", sample());
        assert_eq!(recover_json(&text).unwrap(), sample());
    }

    #[test]
    fn recovers_from_bare_fence() {
        let text = format!("Result:\n```\n{}\n```\nDone.", sample());
        assert_eq!(recover_json(&text).unwrap(), sample());
    }

    #[test]
    fn recovers_from_unfenced_text() {
        assert_eq!(recover_json(&sample().to_string()).unwrap(), sample());
    }

    #[test]
    fn recovers_from_surrounding_commentary() {
        let text = format!("Here you go: {} thanks", sample());
        assert_eq!(recover_json(&text).unwrap(), sample());
    }

    #[test]
    fn labeled_fence_wins_over_bare_fence() {
        let text = "```\n{\"stops\": []}\n```\n```json\n{\"stops\": [{\"stopNumber\": \"9\"}]}\n```";
        let value = recover_json(text).unwrap();
        assert_eq!(value["stops"][0]["stopNumber"], "9");
    }

    #[test]
    fn unclosed_fence_falls_back_to_braces() {
        let text = "```json\n{\"stops\": [{\"stopNumber\": \"3\"}]}\n(truncated";
        let value = recover_json(text).unwrap();
        assert_eq!(value["stops"][0]["stopNumber"], "3");
    }

    #[test]
    fn brace_span_covering_two_objects_is_malformed() {
        // First '{' to last '}' crosses the broken fence, so nothing parses.
        let text = "```json\n{\"stops\": [}\n```\nActually: {\"stops\": []}";
        assert!(matches!(
            recover_json(text),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn no_braces_is_malformed() {
        let err = recover_json("Sorry, I could not read this image.").unwrap_err();
        match err {
            ExtractionError::MalformedResponse(msg) => {
                assert_eq!(msg, MALFORMED_RESPONSE_MESSAGE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_is_malformed() {
        assert!(matches!(
            recover_json("} nothing here {"),
            Err(ExtractionError::MalformedResponse(_))
        ));
        assert!(matches!(
            recover_json("{ \"stops\": [ "),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn scalar_json_is_not_a_container() {
        assert!(matches!(
            recover_json("42"),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parses_stops_into_raw_candidates() {
        let result = parse_stops_response(&sample().to_string()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.stops[0].address, "Rua A, 10");
        assert_eq!(result.stops[1].stop_number, "2");
    }

    #[test]
    fn object_without_stops_yields_nothing() {
        let result = parse_stops_response("{\"items\": []}").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn top_level_array_is_the_stop_list() {
        let result = parse_stops_response("[{\"stopNumber\": 4, \"address\": \"Rua C\"}]").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.stops[0].stop_number, "4");
        assert_eq!(result.stops[0].cep, "");
    }

    #[test]
    fn non_object_items_are_skipped() {
        let result =
            parse_stops_response("{\"stops\": [\"junk\", 3, {\"stopNumber\": \"1\"}]}").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.stops[0].stop_number, "1");
    }
}
