use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::reconcile::SortPolicy;

/// Application-level constants
pub const APP_NAME: &str = "RouteScan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Get the application data directory (~/RouteScan/)
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Default destination for CSV exports
pub fn export_dir() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("exports"))
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,routescan_lib=debug,reqwest=warn,hyper=warn"
}

// ──────────────────────────────────────────────
// Extraction service configuration
// ──────────────────────────────────────────────

/// Settings for the vision extraction service and reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// API key; requests fail with `NotConfigured` when absent
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub sort_policy: SortPolicy,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    8192
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            sort_policy: SortPolicy::default(),
        }
    }
}

impl ExtractionConfig {
    /// Defaults overridden by `GEMINI_API_KEY`, `ROUTESCAN_MODEL`,
    /// `ROUTESCAN_BASE_URL` and `ROUTESCAN_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(model) = non_empty("ROUTESCAN_MODEL") {
            config.model = model;
        }
        if let Some(url) = non_empty("ROUTESCAN_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = non_empty("ROUTESCAN_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "ROUTESCAN_TIMEOUT_SECS",
                    value: raw,
                })?;
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_sort_policy(mut self, sort_policy: SortPolicy) -> Self {
        self.sort_policy = sort_policy;
        self
    }

    /// Whether a request can be attempted at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
