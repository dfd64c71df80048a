use axum::Json;
use axum::response::IntoResponse;

// liveness of this service, not of the generation backend
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
