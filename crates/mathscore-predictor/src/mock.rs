//! Mock predictor for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mathscore_core::error::PredictorError;
use mathscore_core::features::FeatureVector;
use mathscore_core::model::PredictionResult;
use mathscore_core::traits::Predictor;

/// A predictor that never spawns anything.
///
/// Returns a fixed outcome, optionally after a delay, and records what it was
/// asked.
pub struct MockPredictor {
    outcome: Result<PredictionResult, PredictorError>,
    delay: Option<Duration>,
    call_count: AtomicU32,
    last_vector: Mutex<Option<FeatureVector>>,
}

impl MockPredictor {
    /// A mock that always succeeds with `result`.
    pub fn with_result(result: PredictionResult) -> Self {
        Self::with_outcome(Ok(result))
    }

    /// A mock that always fails with `error`.
    pub fn failing(error: PredictorError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<PredictionResult, PredictorError>) -> Self {
        Self {
            outcome,
            delay: None,
            call_count: AtomicU32::new(0),
            last_vector: Mutex::new(None),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The vector of the most recent invocation.
    pub fn last_vector(&self) -> Option<FeatureVector> {
        self.last_vector.lock().ok().and_then(|guard| *guard)
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, features: &FeatureVector) -> Result<PredictionResult, PredictorError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_vector.lock() {
            *last = Some(*features);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
