//! Script-backed predictor and scaler.
//!
//! The predictor passes the feature vector as the final command-line argument;
//! the scaler writes the payload to standard input. Both expect a single JSON
//! object on standard output and a zero exit code.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::instrument;

use mathscore_core::error::{PredictorError, ScaleError};
use mathscore_core::features::FeatureVector;
use mathscore_core::model::PredictionResult;
use mathscore_core::traits::{Predictor, Scaler};

use crate::process::{self, ProcedureCommand};

/// Default bound on a single procedure run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse predictor stdout into a [`PredictionResult`].
pub fn parse_prediction(stdout: &str) -> Result<PredictionResult, PredictorError> {
    serde_json::from_str(stdout.trim()).map_err(|e| PredictorError::MalformedOutput(e.to_string()))
}

/// Parse scaler stdout into a JSON object.
pub fn parse_object(stdout: &str) -> Result<Map<String, Value>, PredictorError> {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PredictorError::MalformedOutput(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(PredictorError::MalformedOutput(e.to_string())),
    }
}

/// Predictor that runs an external scoring procedure per request.
pub struct ScriptPredictor {
    command: ProcedureCommand,
    timeout: Duration,
    name: String,
}

impl ScriptPredictor {
    pub fn new(command: ProcedureCommand) -> Self {
        let name = command.display();
        Self {
            command,
            timeout: DEFAULT_TIMEOUT,
            name,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Predictor for ScriptPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, features), fields(command = %self.name))]
    async fn invoke(&self, features: &FeatureVector) -> Result<PredictionResult, PredictorError> {
        let arg = features.to_json();
        let output = process::run(&self.command, &[&arg], None, self.timeout)
            .await?
            .into_success()?;
        parse_prediction(&output.stdout)
    }
}

/// Scaler that delegates normalization to an external procedure.
pub struct ScriptScaler {
    command: ProcedureCommand,
    timeout: Duration,
    name: String,
}

impl ScriptScaler {
    pub fn new(command: ProcedureCommand) -> Self {
        let name = command.display();
        Self {
            command,
            timeout: DEFAULT_TIMEOUT,
            name,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Scaler for ScriptScaler {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, payload), fields(command = %self.name))]
    async fn scale(&self, payload: Map<String, Value>) -> Result<Map<String, Value>, ScaleError> {
        let input = serde_json::to_vec(&payload)
            .map_err(|e| PredictorError::MalformedOutput(format!("unserializable payload: {e}")))?;
        let output = process::run(&self.command, &[], Some(&input), self.timeout)
            .await?
            .into_success()?;
        let scaled = parse_object(&output.stdout)?;

        if let Some(error) = scaled.get("error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ScaleError::Rejected(message));
        }
        Ok(scaled)
    }
}
