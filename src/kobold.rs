use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::{ClientConfig, KOBOLD_URL_ENV, join_url};
use crate::models::ConnectionReport;
use crate::settings::{SettingsProvider, blocking};

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);
pub const MODEL_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub const REPETITION_PENALTY: f64 = 1.1;
pub const STOP_SEQUENCES: [&str; 3] = ["</s>", "User:", "System:"];

#[derive(Debug, Error)]
pub enum KoboldError {
    #[error("cannot connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {url} has no generated text")]
    MissingText { url: String },
}

impl KoboldError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_connect() {
            Self::Connect { url, source }
        } else {
            Self::Transport { url, source }
        }
    }
}

// Per-call overrides; `None` falls back to the resolved config
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub max_length: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
}

// POST /v1/generate body
#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    prompt: &'a str,
    max_length: u32,
    temperature: f64,
    top_p: f64,
    top_k: u32,
    rep_pen: f64,
    stop_sequence: [&'static str; 3],
}

// Accepts `{text}` as well as KoboldAI's native `{results: [{text}]}`
#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    results: Vec<GeneratedChunk>,
}

#[derive(Debug, Deserialize)]
struct GeneratedChunk {
    text: String,
}

impl GenerateReply {
    fn into_text(self) -> Option<String> {
        self.text
            .or_else(|| self.results.into_iter().next().map(|chunk| chunk.text))
    }
}

fn is_status_ok(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("ok")
}

pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Clone)]
pub struct KoboldClient {
    http: reqwest::Client,
    settings: Arc<dyn SettingsProvider>,
    env: EnvLookup,
}

impl KoboldClient {
    pub fn new(http: reqwest::Client, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            http,
            settings,
            env: process_env,
        }
    }

    // Replace the process environment as the source of KOBOLD_API_URL
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    // Never fails: unreadable settings leave the defaults in place
    pub async fn resolve_config(&self, override_url: Option<&str>) -> ClientConfig {
        let env_url = (self.env)(KOBOLD_URL_ENV);
        let stored = match blocking(&self.settings, |s| s.all_settings()).await {
            Ok(settings) => Some(settings),
            Err(e) => {
                debug!(error = %e, "settings unavailable, using defaults");
                None
            }
        };
        let config = ClientConfig::resolve(override_url, env_url.as_deref(), stored.as_ref());
        debug!(url = %config.base_url, temperature = config.temperature, "backend config resolved");
        config
    }

    pub async fn health_check(&self) -> bool {
        let config = self.resolve_config(None).await;
        self.health_check_with(&config).await
    }

    // True only for a 2xx JSON body with `status == "ok"`
    pub async fn health_check_with(&self, config: &ClientConfig) -> bool {
        let url = config.endpoint("health");
        match self.get_json(&url, HEALTH_TIMEOUT).await {
            Ok(body) => is_status_ok(&body),
            Err(e) => {
                warn!(error = %e, "backend health check failed");
                false
            }
        }
    }

    pub async fn generate_text(&self, prompt: &str, params: &GenerationParams) -> Result<String, KoboldError> {
        let config = self.resolve_config(None).await;
        self.generate_text_with(&config, prompt, params).await
    }

    pub async fn generate_text_with(
        &self,
        config: &ClientConfig,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, KoboldError> {
        let url = config.endpoint("v1/generate");
        let payload = GeneratePayload {
            prompt,
            max_length: params.max_length.unwrap_or(config.max_length),
            temperature: params.temperature.unwrap_or(config.temperature),
            top_p: params.top_p.unwrap_or(config.top_p),
            top_k: params.top_k.unwrap_or(config.top_k),
            rep_pen: REPETITION_PENALTY,
            stop_sequence: STOP_SEQUENCES,
        };

        let response = self
            .http
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| KoboldError::from_reqwest(&url, e))?;
        let reply: GenerateReply = read_json(&url, response).await?;

        reply
            .into_text()
            .map(|text| text.trim().to_string())
            .ok_or(KoboldError::MissingText { url })
    }

    // Model metadata, or `{"error": ...}` when the backend cannot answer
    pub async fn model_info(&self, override_url: Option<&str>) -> Value {
        let config = self.resolve_config(override_url).await;
        let url = config.endpoint("v1/model");
        match self.get_json(&url, MODEL_TIMEOUT).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "could not fetch model info");
                json!({ "error": e.to_string() })
            }
        }
    }

    // Probe health then model on a candidate URL; settings are never written
    pub async fn test_connection(&self, api_url: Option<&str>) -> ConnectionReport {
        let base = match api_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => self.resolve_config(None).await.base_url,
        };

        let health = match self.get_json(&join_url(&base, "health"), PROBE_TIMEOUT).await {
            Ok(body) => body,
            Err(e) => return probe_failure(&base, &e),
        };
        if !is_status_ok(&health) {
            return ConnectionReport::failed("API reachable but status is not valid");
        }

        // Anything but 200 from the model endpoint still counts as connected
        let model_url = join_url(&base, "v1/model");
        let response = match self.http.get(&model_url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => return probe_failure(&base, &KoboldError::from_reqwest(&model_url, e)),
        };
        if response.status() != StatusCode::OK {
            return ConnectionReport::succeeded("Connection succeeded but model info unavailable", None);
        }
        match read_json(&model_url, response).await {
            Ok(info) => ConnectionReport::succeeded("Connection succeeded and model available", Some(info)),
            Err(e) => probe_failure(&base, &e),
        }
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, KoboldError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| KoboldError::from_reqwest(url, e))?;
        read_json(url, response).await
    }
}

async fn read_json<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, KoboldError> {
    let status = response.status();
    if !status.is_success() {
        return Err(KoboldError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| KoboldError::from_reqwest(url, e))?;
    serde_json::from_slice(&body).map_err(|source| KoboldError::Decode {
        url: url.to_string(),
        source,
    })
}

fn probe_failure(base: &str, err: &KoboldError) -> ConnectionReport {
    error!(url = %base, error = %err, "connection test failed");
    let message = match err {
        KoboldError::Connect { .. } => "Cannot connect to the API: connection refused".to_string(),
        KoboldError::Timeout { .. } => "Timed out while connecting to the API".to_string(),
        KoboldError::Status { status, .. } => format!("Invalid HTTP response: {status}"),
        KoboldError::Decode { .. } => "API responded but the body is not valid JSON".to_string(),
        other => other.to_string(),
    };
    ConnectionReport::failed(message)
}
