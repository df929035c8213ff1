//! HTTP client for the two-step form flow.
//!
//! Mirrors what the browser does: submit the raw form to `/validate`, then
//! hand the normalized object to `/predict`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use mathscore_core::model::FormDraft;
use mathscore_core::validation::ValidationError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors seen by a client of the service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The form is not ready to submit; nothing was sent.
    #[error("incomplete form: {0}")]
    Incomplete(#[from] ValidationError),

    /// The server answered with an error body.
    #[error("server rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered 2xx with an unexpected body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A successful `/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub math_score_prediction: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Value>,
    /// Every echoed input field.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for a running mathscore server.
pub struct FormClient {
    base_url: String,
    client: reqwest::Client,
}

impl FormClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post(&self, route: &str, body: &Map<String, Value>) -> Result<Value, ClientError> {
        let response = self
            .client
            .post(format!("{}{route}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Run the scale stage.
    #[instrument(skip(self, payload))]
    pub async fn scale(&self, payload: &Map<String, Value>) -> Result<Map<String, Value>, ClientError> {
        match self.post("/validate", payload).await? {
            Value::Object(map) => Ok(map),
            other => Err(ClientError::InvalidResponse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Run the predict stage.
    #[instrument(skip(self, payload))]
    pub async fn predict(&self, payload: &Map<String, Value>) -> Result<PredictionResponse, ClientError> {
        let value = self.post("/predict", payload).await?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Submit a form: check it locally, scale it, then predict from the scaled
    /// output.
    pub async fn submit(&self, draft: &FormDraft) -> Result<PredictionResponse, ClientError> {
        draft.ensure_ready()?;

        let scaled = self.scale(&draft.to_payload()).await?;
        tracing::debug!(fields = scaled.len(), "form scaled");
        self.predict(&scaled).await
    }

    /// Fetch `/health`.
    pub async fn health(&self) -> Result<Value, ClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}
