use axum::http::StatusCode;
use prometheus::{Encoder, TextEncoder};

use super::{ApiError, api_error};

pub async fn metrics_handler() -> Result<String, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
