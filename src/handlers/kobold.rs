use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::{ConnectionReport, ConnectionRequest, ModelInfoResponse};
use crate::state::AppState;

// Diagnostic probe of a candidate backend URL
pub async fn test_connection_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectionRequest>,
) -> Json<ConnectionReport> {
    let report = state.generator.client().test_connection(payload.api_url.as_deref()).await;
    Json(report)
}

// `api_url` only applies to this call; persisted settings are left alone
pub async fn model_info_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectionRequest>,
) -> Json<ModelInfoResponse> {
    let model_info = state.generator.client().model_info(payload.api_url.as_deref()).await;
    Json(ModelInfoResponse {
        success: model_info.get("error").is_none(),
        model_info,
    })
}
