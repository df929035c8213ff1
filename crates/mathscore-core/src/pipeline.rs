//! The two request flows, independent of any transport.
//!
//! Scale:   received -> validated -> normalized -> responded
//! Predict: received -> validated -> vector built -> predictor invoked -> result merged -> responded
//!
//! Neither flow keeps state between calls; the client carries the scale output
//! into the predict input.

use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::features::FeatureVector;
use crate::model::{FeatureRecord, PredictionResult, SCALE_REQUIRED};
use crate::traits::{Predictor, Scaler};
use crate::validation::require_fields;

/// Key the predicted score is merged under.
pub const PREDICTION_KEY: &str = "math_score_prediction";

/// Key the model confidence is merged under (`null` when absent).
pub const CONFIDENCE_KEY: &str = "confidence";

/// Key the model metadata is merged under, when the scorer reports it.
pub const MODEL_INFO_KEY: &str = "model_info";

/// Run the scale flow.
pub async fn scale(
    scaler: &dyn Scaler,
    payload: Map<String, Value>,
) -> Result<Map<String, Value>, PipelineError> {
    require_fields(&payload, &SCALE_REQUIRED)?;
    tracing::debug!("all scale fields present");

    let scaled = scaler.scale(payload).await?;
    tracing::debug!(scaler = scaler.name(), fields = scaled.len(), "payload normalized");
    Ok(scaled)
}

/// Run the predict flow and return the payload merged with the prediction.
pub async fn predict(
    predictor: &dyn Predictor,
    payload: Map<String, Value>,
) -> Result<Map<String, Value>, PipelineError> {
    let record = FeatureRecord::from_payload(&payload)?;
    tracing::debug!("all predict fields present and in range");

    let vector = FeatureVector::from_record(&record);
    tracing::debug!(vector = %vector.to_json(), "feature vector built");

    let prediction = predictor.invoke(&vector).await?;
    tracing::info!(
        predictor = predictor.name(),
        math_score = prediction.math_score,
        confidence = ?prediction.confidence,
        "prediction received"
    );

    Ok(merge(payload, prediction))
}

/// Merge a prediction into the request payload.
///
/// Input keys are kept as sent; the prediction keys overwrite any collision.
pub fn merge(mut payload: Map<String, Value>, prediction: PredictionResult) -> Map<String, Value> {
    payload.insert(PREDICTION_KEY.to_string(), Value::from(prediction.math_score));
    payload.insert(
        CONFIDENCE_KEY.to_string(),
        prediction.confidence.map_or(Value::Null, Value::from),
    );
    if let Some(info) = prediction.model_info {
        payload.insert(MODEL_INFO_KEY.to_string(), info);
    }
    payload
}
