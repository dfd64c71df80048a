use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::Outcome;

// Product category, referenced by companies and templates
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// Company receiving review requests
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub products: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    // category id
    #[serde(default)]
    pub category: Option<String>,
}

// Message template with `[Nome Azienda]`, `[Categoria]` and `[Nome]` placeholders
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

// POST /generate_request body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

// POST /generate_request reply
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub company: Company,
    pub outcome: Outcome,
}

// Body shared by the connection test and model info endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionRequest {
    #[serde(default)]
    pub api_url: Option<String>,
}

// Result of probing a candidate backend URL
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Value>,
}

impl ConnectionReport {
    pub fn succeeded(message: impl Into<String>, model_info: Option<Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            model_info,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            model_info: None,
        }
    }
}

// POST /get_kobold_model_info reply
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub success: bool,
    pub model_info: Value,
}
