use axum::http::StatusCode;
use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::error;

use super::{ApiError, api_error};
use crate::settings::{SettingsError, SettingsMap, SettingsProvider, blocking, default_settings};
use crate::state::AppState;

pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<SettingsMap> {
    let settings = blocking(&state.settings, |s| s.all_settings()).await.unwrap_or_else(|e| {
        error!(error = %e, "could not read settings, showing defaults");
        default_settings()
    });
    Json(settings)
}

pub async fn save_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SettingsMap>,
) -> Result<Json<SettingsMap>, ApiError> {
    match blocking(&state.settings, move |s| s.save_settings(&payload)).await {
        Ok(saved) => Ok(Json(saved)),
        Err(e @ SettingsError::InvalidValue { .. }) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!(error = %e, "could not save settings");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn saved_settings_are_served_back() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let payload: SettingsMap = serde_json::from_value(json!({ "temperature": "0.5", "top_k": 20 })).unwrap();

        let Json(saved) = save_settings_handler(State(state.clone()), Json(payload)).await.unwrap();
        let Json(served) = get_settings_handler(State(state)).await;

        assert_eq!(saved, served);
        assert_eq!(served["temperature"], json!(0.5));
        assert_eq!(served["kobold_api_url"], json!("http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn invalid_values_are_bad_requests() {
        let (state, _dir) = test_state("http://127.0.0.1:9");
        let payload: SettingsMap = serde_json::from_value(json!({ "top_p": "high" })).unwrap();

        let (status, _) = save_settings_handler(State(state), Json(payload)).await.unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
