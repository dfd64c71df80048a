mod cache;
mod catalog;
mod generate;
mod health;
mod kobold;
mod metrics;
mod settings;
#[cfg(test)]
mod test_support;

pub use cache::purge_cache_handler;
pub use catalog::categories_handler;
pub use generate::generate_handler;
pub use health::health_handler;
pub use kobold::{model_info_handler, test_connection_handler};
pub use metrics::metrics_handler;
pub use settings::{get_settings_handler, save_settings_handler};

use axum::Json;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

// Error reply: status code plus `{"error": ...}`
pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/generate_request", post(generate_handler))
        .route("/test_kobold_connection", post(test_connection_handler))
        .route("/get_kobold_model_info", post(model_info_handler))
        .route("/settings", get(get_settings_handler).post(save_settings_handler))
        .route("/cache/purge", post(purge_cache_handler))
        .route("/categories", get(categories_handler))
        .with_state(state)
}
