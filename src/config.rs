use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

use crate::settings::{
    KOBOLD_API_URL, MAX_LENGTH, SettingsMap, TEMPERATURE, TOP_K, TOP_P, USE_FALLBACK, is_truthy,
    value_as_f64, value_as_u32,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";
pub const KOBOLD_URL_ENV: &str = "KOBOLD_API_URL";

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "recenzione-gateway")]
#[command(about = "Review request drafting service backed by a local KoboldAI server")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Directory holding one JSON file per cached request
    #[arg(long, default_value = "data/ai_cache")]
    pub cache_dir: PathBuf,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 86400)]
    pub cache_ttl: u64,

    // Persisted runtime settings (backend URL, sampling parameters)
    #[arg(long, default_value = "data/settings.json")]
    pub settings_file: PathBuf,

    // Categories, companies and templates seed file
    #[arg(long, default_value = "data/catalog.json")]
    pub catalog_file: PathBuf,
}

/// Backend configuration resolved for a single call.
///
/// Never shared mutably: every operation resolves its own value and passes
/// it down, so concurrent requests cannot observe each other's overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub temperature: f64,
    pub max_length: u32,
    pub top_p: f64,
    pub top_k: u32,
    pub use_fallback: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_length: 1000,
            top_p: 0.9,
            top_k: 40,
            use_fallback: true,
        }
    }
}

impl ClientConfig {
    // Base URL priority: explicit override, then environment, then settings, then default.
    // Sampling parameters come from settings only.
    pub fn resolve(override_url: Option<&str>, env_url: Option<&str>, settings: Option<&SettingsMap>) -> Self {
        let mut config = Self::default();

        if let Some(settings) = settings {
            if let Some(url) = settings.get(KOBOLD_API_URL).and_then(Value::as_str).and_then(non_blank) {
                config.base_url = url.to_string();
            }
            if let Some(t) = settings.get(TEMPERATURE).and_then(value_as_f64) {
                config.temperature = t;
            }
            if let Some(n) = settings.get(MAX_LENGTH).and_then(value_as_u32) {
                config.max_length = n;
            }
            if let Some(p) = settings.get(TOP_P).and_then(value_as_f64) {
                config.top_p = p;
            }
            if let Some(k) = settings.get(TOP_K).and_then(value_as_u32) {
                config.top_k = k;
            }
            if let Some(flag) = settings.get(USE_FALLBACK) {
                config.use_fallback = is_truthy(flag);
            }
        }

        if let Some(url) = override_url.and_then(non_blank).or_else(|| env_url.and_then(non_blank)) {
            config.base_url = url.to_string();
        }

        config
    }

    // `{base}/{path}` regardless of a trailing slash on the base
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> SettingsMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let config = ClientConfig::resolve(None, None, None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:5001/api");
    }

    #[test]
    fn base_url_priority_is_override_env_settings() {
        let stored = settings(json!({ "kobold_api_url": "http://settings:5001/api" }));

        let from_settings = ClientConfig::resolve(None, None, Some(&stored));
        assert_eq!(from_settings.base_url, "http://settings:5001/api");

        let from_env = ClientConfig::resolve(None, Some("http://env:5001/api"), Some(&stored));
        assert_eq!(from_env.base_url, "http://env:5001/api");

        let from_override = ClientConfig::resolve(Some("http://arg:5001/api"), Some("http://env:5001/api"), Some(&stored));
        assert_eq!(from_override.base_url, "http://arg:5001/api");
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = ClientConfig::resolve(Some("  "), Some(""), None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn sampling_parameters_accept_strings_and_numbers() {
        let stored = settings(json!({
            "temperature": "0.3",
            "max_length": 250,
            "top_p": 0.5,
            "top_k": "12",
            "use_fallback": "false"
        }));
        let config = ClientConfig::resolve(None, Some("http://env:5001/api"), Some(&stored));

        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_length, 250);
        assert_eq!(config.top_p, 0.5);
        assert_eq!(config.top_k, 12);
        assert!(!config.use_fallback);
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = ClientConfig {
            base_url: "http://localhost:5001/api/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(config.endpoint("v1/generate"), "http://localhost:5001/api/v1/generate");
        assert_eq!(config.endpoint("health"), "http://localhost:5001/api/health");
    }
}
