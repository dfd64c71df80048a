use axum::http::StatusCode;
use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::{ApiError, api_error};
use crate::state::AppState;

// Delete expired entries that reads have been ignoring
pub async fn purge_cache_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let purged = state
        .generator
        .cache()
        .purge_expired()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    info!(purged, "expired cache entries removed");
    Ok(Json(json!({ "purged": purged })))
}
