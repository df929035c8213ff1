//! Pipeline error types.
//!
//! Defined in `mathscore-core` so the HTTP layer can map each failure to a
//! status code without inspecting message strings.

use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationError;

/// Failures of a single external-procedure invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    /// The procedure could not be started.
    #[error("failed to launch `{command}`: {message}")]
    Launch { command: String, message: String },

    /// The procedure exited with a failure code.
    #[error("{}", exit_message(.code, .stderr))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// Standard output was not the expected JSON shape.
    #[error("malformed predictor output: {0}")]
    MalformedOutput(String),

    /// The procedure did not finish in time and was killed.
    #[error("predictor timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

fn exit_message(code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    match (code, stderr.is_empty()) {
        (_, false) => stderr.to_string(),
        (Some(code), true) => format!("process exited with code {code}"),
        (None, true) => "process terminated by signal".to_string(),
    }
}

impl PredictorError {
    /// Diagnostic text safe to hand back to the operator.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// Failures of the scale stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    /// The payload itself is unacceptable.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The scale procedure refused the payload with its own message.
    #[error("{0}")]
    Rejected(String),

    /// The scale procedure failed to run.
    #[error("scale procedure failed: {0}")]
    Procedure(#[from] PredictorError),
}

/// Terminal failure of either request flow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Client-side problem; the predictor was never invoked.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The external scoring procedure failed.
    #[error(transparent)]
    Predictor(#[from] PredictorError),

    /// Anything unexpected. The message is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ScaleError> for PipelineError {
    fn from(err: ScaleError) -> Self {
        match err {
            ScaleError::Invalid(e) => PipelineError::Validation(e),
            // A rejection message from the procedure is relayed to the client.
            ScaleError::Rejected(msg) => PipelineError::Validation(ValidationError::Rejected(msg)),
            ScaleError::Procedure(e) => PipelineError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_shows_stderr() {
        let err = PredictorError::NonZeroExit {
            code: Some(1),
            stderr: "model not found\n".into(),
        };
        assert_eq!(err.to_string(), "model not found");
    }

    #[test]
    fn non_zero_exit_without_stderr_shows_code() {
        let err = PredictorError::NonZeroExit {
            code: Some(3),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "process exited with code 3");
    }

    #[test]
    fn timeout_message() {
        let err = PredictorError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "predictor timed out after 1.5s");
    }

    #[test]
    fn scale_procedure_failure_is_internal() {
        let err: PipelineError = ScaleError::Procedure(PredictorError::MalformedOutput(
            "expected value".into(),
        ))
        .into();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[test]
    fn scale_rejection_is_a_validation_error() {
        let err: PipelineError = ScaleError::Rejected("Error al validar datos".into()).into();
        assert_eq!(
            err,
            PipelineError::Validation(ValidationError::Rejected("Error al validar datos".into()))
        );
    }
}
