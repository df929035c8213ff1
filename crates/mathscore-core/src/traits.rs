//! Capabilities the pipeline depends on.
//!
//! Implemented by the `mathscore-predictor` crate for real subprocesses, and
//! by test doubles in unit tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{PredictorError, ScaleError};
use crate::features::FeatureVector;
use crate::model::PredictionResult;

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// An external scoring model.
///
/// One call is one invocation; implementations never retry.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Human-readable name (e.g. the command being run).
    fn name(&self) -> &str;

    /// Score a feature vector.
    async fn invoke(&self, features: &FeatureVector) -> Result<PredictionResult, PredictorError>;
}

// ---------------------------------------------------------------------------
// Scaler
// ---------------------------------------------------------------------------

/// The scale stage: turns raw form input into values the predict stage accepts.
///
/// What the transformation does is up to the implementation; callers only rely
/// on getting a JSON object back.
#[async_trait]
pub trait Scaler: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Normalize a payload that already passed the presence check.
    async fn scale(&self, payload: Map<String, Value>) -> Result<Map<String, Value>, ScaleError>;
}
