use axum::http::StatusCode;
use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::{ApiError, api_error};
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{GenerateRequest, GenerateResponse};
use crate::state::AppState;

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let non_empty = |id: Option<String>| id.filter(|s| !s.trim().is_empty());
    let (Some(company_id), Some(template_id)) = (non_empty(payload.company_id), non_empty(payload.template_id)) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "company_id and template_id are required"));
    };

    let (Some(company), Some(template)) = (state.catalog.company(&company_id), state.catalog.template(&template_id))
    else {
        return Err(api_error(StatusCode::NOT_FOUND, "company or template not found"));
    };

    let start_time = Instant::now();
    let generated = state.generator.generate(&company, &template, payload.use_cache).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    debug!(company = %company.name, outcome = ?generated.outcome, "generate request served");

    Ok(Json(GenerateResponse {
        message: generated.text,
        company,
        outcome: generated.outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Outcome;
    use crate::handlers::test_support::test_state;

    fn request(company_id: Option<&str>, template_id: Option<&str>) -> Json<GenerateRequest> {
        Json(GenerateRequest {
            company_id: company_id.map(str::to_string),
            template_id: template_id.map(str::to_string),
            use_cache: true,
        })
    }

    #[tokio::test]
    async fn missing_ids_are_rejected() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let (status, body) = generate_handler(State(state), request(Some("co-1"), Some("  ")))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let (status, _) = generate_handler(State(state), request(Some("co-1"), Some("tpl-9")))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn backend_down_still_answers_with_fallback() {
        let (state, _dir) = test_state("http://127.0.0.1:9");

        let Json(reply) = generate_handler(State(state), request(Some("co-1"), Some("tpl-1")))
            .await
            .unwrap();

        assert_eq!(reply.message, "Gentile Acme, Team C-Recenzione");
        assert_eq!(reply.outcome, Outcome::BackendDown);
        assert_eq!(reply.company.id, "co-1");
    }
}
