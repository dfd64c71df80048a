use serde_json::{Map, Value, json};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DEFAULT_BASE_URL, KOBOLD_URL_ENV};

pub type SettingsMap = Map<String, Value>;

pub const KOBOLD_API_URL: &str = "kobold_api_url";
pub const USE_FALLBACK: &str = "use_fallback";
pub const MAX_LENGTH: &str = "max_length";
pub const TEMPERATURE: &str = "temperature";
pub const TOP_P: &str = "top_p";
pub const TOP_K: &str = "top_k";

const KNOWN_KEYS: [&str; 6] = [KOBOLD_API_URL, USE_FALLBACK, MAX_LENGTH, TEMPERATURE, TOP_P, TOP_K];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for setting '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("settings task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn default_settings() -> SettingsMap {
    let mut map = SettingsMap::new();
    map.insert(KOBOLD_API_URL.into(), json!(DEFAULT_BASE_URL));
    map.insert(USE_FALLBACK.into(), json!(true));
    map.insert(MAX_LENGTH.into(), json!(1000));
    map.insert(TEMPERATURE.into(), json!(0.7));
    map.insert(TOP_P.into(), json!(0.9));
    map.insert(TOP_K.into(), json!(40));
    map
}

/// Key/value settings store handed to the backend client at construction.
pub trait SettingsProvider: Send + Sync {
    /// Raw stored values, without defaults.
    fn load(&self) -> Result<SettingsMap, SettingsError>;

    /// Replace the stored values.
    fn store(&self, settings: &SettingsMap) -> Result<(), SettingsError>;

    fn all_settings(&self) -> Result<SettingsMap, SettingsError> {
        let mut merged = default_settings();
        merged.extend(self.load()?);
        Ok(merged)
    }

    fn setting(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.all_settings()?.remove(key))
    }

    /// Validate, coerce and persist `input`. Keys absent from `input` keep
    /// their current value; unknown keys are dropped.
    fn save_settings(&self, input: &SettingsMap) -> Result<SettingsMap, SettingsError> {
        let current = self.all_settings().unwrap_or_else(|e| {
            debug!(error = %e, "current settings unreadable, saving over defaults");
            default_settings()
        });
        let normalized = normalize_settings(input, &current)?;
        self.store(&normalized)?;
        info!("settings saved");
        Ok(normalized)
    }
}

// Providers do blocking I/O, so async callers go through the blocking pool
pub async fn blocking<T, F>(provider: &Arc<dyn SettingsProvider>, call: F) -> Result<T, SettingsError>
where
    T: Send + 'static,
    F: FnOnce(&dyn SettingsProvider) -> Result<T, SettingsError> + Send + 'static,
{
    let provider = Arc::clone(provider);
    tokio::task::spawn_blocking(move || call(provider.as_ref())).await?
}

// Keep only known keys and coerce each one to its expected type
pub fn normalize_settings(input: &SettingsMap, current: &SettingsMap) -> Result<SettingsMap, SettingsError> {
    let defaults = default_settings();
    let mut out = SettingsMap::new();

    for key in KNOWN_KEYS {
        let Some(raw) = input.get(key).or_else(|| current.get(key)).or_else(|| defaults.get(key)) else {
            continue;
        };
        let value = match key {
            KOBOLD_API_URL => match raw {
                Value::String(s) if !s.trim().is_empty() => json!(s.trim()),
                Value::Null | Value::String(_) => defaults[KOBOLD_API_URL].clone(),
                other => return Err(invalid(key, other)),
            },
            USE_FALLBACK => json!(is_truthy(raw)),
            MAX_LENGTH | TOP_K => json!(value_as_u32(raw).ok_or_else(|| invalid(key, raw))?),
            _ => json!(value_as_f64(raw).ok_or_else(|| invalid(key, raw))?),
        };
        out.insert(key.to_string(), value);
    }

    Ok(out)
}

fn invalid(key: &str, value: &Value) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

// Numbers may arrive as JSON numbers or as form strings
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f: &f64| f.is_finite())
}

pub fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.as_str(), "true" | "True" | "on" | "1"),
        _ => false,
    }
}

// Copy KOBOLD_API_URL into the persisted settings; returns whether anything changed
pub fn apply_env_overrides(provider: &dyn SettingsProvider) -> Result<bool, SettingsError> {
    let Some(url) = std::env::var(KOBOLD_URL_ENV).ok().filter(|u| !u.trim().is_empty()) else {
        return Ok(false);
    };
    let current = provider.setting(KOBOLD_API_URL)?;
    if current.as_ref().and_then(Value::as_str) == Some(url.trim()) {
        return Ok(false);
    }

    let mut input = SettingsMap::new();
    input.insert(KOBOLD_API_URL.into(), json!(url));
    provider.save_settings(&input)?;
    info!(url = %url, "backend URL taken from {}", KOBOLD_URL_ENV);
    Ok(true)
}

// Settings persisted as a pretty-printed JSON object
pub struct JsonFileSettings {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettings {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

impl SettingsProvider for JsonFileSettings {
    fn load(&self) -> Result<SettingsMap, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SettingsMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, settings: &SettingsMap) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}
