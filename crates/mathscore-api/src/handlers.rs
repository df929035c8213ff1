//! HTTP request handlers.

use std::future::Future;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use mathscore_core::error::PipelineError;
use mathscore_core::pipeline;
use mathscore_core::validation::ValidationError;

use crate::error::ApiError;
use crate::ApiState;

/// Build all routes.
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        // Scale stage
        .route("/validate", post(validate))
        .route("/api/escalar", post(validate))
        // Predict stage
        .route("/predict", post(predict))
        .route("/api/predict", post(predict))
        .route("/health", get(health_check))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

async fn route_not_found() -> ApiError {
    ApiError::Refused(StatusCode::NOT_FOUND)
}

async fn method_not_allowed() -> ApiError {
    ApiError::Refused(StatusCode::METHOD_NOT_ALLOWED)
}

/// Decode a request body into a JSON object.
fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ValidationError::MalformedBody.into()),
    }
}

/// Run a pipeline flow on its own task.
///
/// A client hanging up drops the handler future, but not the spawned task:
/// the external procedure still runs to completion (or its timeout).
async fn detached<F, T>(flow: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(flow.in_current_span()).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(format!("pipeline task failed: {e}"))),
    }
}

async fn validate(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let span = tracing::info_span!("request", request_id = %Uuid::new_v4(), route = "validate");
    async move {
        let body = body?;
        tracing::info!(bytes = body.len(), "scale request received");
        let payload = parse_body(&body)?;

        let scaler = state.scaler.clone();
        let scaled = detached(async move { pipeline::scale(scaler.as_ref(), payload).await }).await?;

        tracing::info!("scale request completed");
        Ok(Json(scaled))
    }
    .instrument(span)
    .await
}

async fn predict(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let span = tracing::info_span!("request", request_id = %Uuid::new_v4(), route = "predict");
    async move {
        let body = body?;
        tracing::info!(bytes = body.len(), "predict request received");
        let payload = parse_body(&body)?;

        let predictor = state.predictor.clone();
        let merged =
            detached(async move { pipeline::predict(predictor.as_ref(), payload).await }).await?;

        tracing::info!("predict request completed");
        Ok(Json(merged))
    }
    .instrument(span)
    .await
}

/// Returns service status, the configured components and uptime.
async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);
    Json(serde_json::json!({
        "status": "healthy",
        "predictor": state.predictor.name(),
        "scaler": state.scaler.name(),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": uptime_secs
    }))
}
