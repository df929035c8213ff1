//! HTTP error mapping.
//!
//! Every failure leaves the handler as a JSON body `{"error": "..."}`.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use mathscore_core::error::{PipelineError, PredictorError};
use mathscore_core::validation::ValidationError;

/// Message returned for any unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";

/// Message returned when the predictor answered with something unparsable.
pub const PARSE_ERROR_MESSAGE: &str = "Error al procesar la predicción";

/// Message returned when the request body exceeds the size limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "Cuerpo de solicitud demasiado grande";

/// A request that ended in a failure state.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Client's fault, 400.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The scoring procedure failed, 500 with diagnostic.
    #[error(transparent)]
    Predictor(#[from] PredictorError),

    /// Anything else, 500 with a generic message.
    #[error("internal error: {0}")]
    Internal(String),

    /// Refused before any flow ran: unknown route, wrong method or oversized
    /// body.
    #[error("request refused with {0}")]
    Refused(StatusCode),
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::Refused(StatusCode::PAYLOAD_TOO_LARGE),
            _ => ApiError::Validation(ValidationError::MalformedBody),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => ApiError::Validation(e),
            PipelineError::Predictor(e) => ApiError::Predictor(e),
            PipelineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Predictor(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Refused(status) => *status,
        }
    }

    /// Text placed in the `error` field of the response body.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Predictor(PredictorError::MalformedOutput(_)) => {
                PARSE_ERROR_MESSAGE.to_string()
            }
            ApiError::Predictor(e) => format!("Error en predicción: {}", e.diagnostic()),
            ApiError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            ApiError::Refused(status) => match *status {
                StatusCode::NOT_FOUND => "Ruta no encontrada".to_string(),
                StatusCode::METHOD_NOT_ALLOWED => "Método no permitido".to_string(),
                StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE_MESSAGE.to_string(),
                _ => ValidationError::MalformedBody.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(e) => tracing::warn!(field = e.field(), "request rejected: {e}"),
            ApiError::Predictor(e) => tracing::error!("prediction failed: {e}"),
            ApiError::Internal(msg) => tracing::error!("internal error: {msg}"),
            ApiError::Refused(status) => tracing::warn!("request refused: {status}"),
        }
        let body = serde_json::json!({ "error": self.client_message() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::from(ValidationError::MissingFields(vec!["writing_score".into()]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Variables faltantes: writing_score");
    }

    #[test]
    fn predictor_failure_includes_diagnostic() {
        let err = ApiError::from(PredictorError::NonZeroExit {
            code: Some(1),
            stderr: "model not found".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Error en predicción: model not found");
    }

    #[test]
    fn malformed_output_is_generic() {
        let err = ApiError::from(PredictorError::MalformedOutput("expected value".into()));
        assert_eq!(err.client_message(), PARSE_ERROR_MESSAGE);
    }

    #[test]
    fn timeout_names_the_bound() {
        let err = ApiError::from(PredictorError::Timeout(Duration::from_secs(5)));
        assert_eq!(
            err.client_message(),
            "Error en predicción: predictor timed out after 5s"
        );
    }

    #[test]
    fn refusals_keep_their_status() {
        let err = ApiError::Refused(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.client_message(), BODY_TOO_LARGE_MESSAGE);

        let err = ApiError::Refused(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.client_message(), "Método no permitido");
    }

    #[test]
    fn internal_hides_details() {
        let err = ApiError::from(PipelineError::Internal("task panicked".into()));
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
        assert!(!err.client_message().contains("panicked"));
    }
}
