use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identity of a stop inside the canonical collection.
///
/// Only used to render and remove entries. Two stops with different ids can
/// still be the same delivery (see `reconcile::DedupKey`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single manifest entry after normalization.
///
/// Fields are read-only once built; the only way to obtain one is
/// `normalize::normalize_stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStop {
    id: StopId,
    stop_number: String,
    address: String,
    cep: String,
    city: String,
}

impl DeliveryStop {
    pub(crate) fn new(
        id: StopId,
        stop_number: String,
        address: String,
        cep: String,
        city: String,
    ) -> Self {
        Self {
            id,
            stop_number,
            address,
            cep,
            city,
        }
    }

    pub fn id(&self) -> &StopId {
        &self.id
    }

    pub fn stop_number(&self) -> &str {
        &self.stop_number
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Postal code, `NNNNN-NNN` when eight digits were recoverable.
    pub fn cep(&self) -> &str {
        &self.cep
    }

    pub fn city(&self) -> &str {
        &self.city
    }
}

/// One stop candidate as returned by the extraction service, before
/// normalization. Every field tolerates absence, null, or a non-string scalar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    #[serde(default, deserialize_with = "lenient_text")]
    pub stop_number: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cep: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: String,
}

/// Candidates produced by one extraction call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub stops: Vec<RawStop>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }
}

/// Accept strings, numbers and booleans as text; null becomes empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
