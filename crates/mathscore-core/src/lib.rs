//! mathscore-core — Data model, validation and the prediction pipeline.
//!
//! This crate defines the feature layout the scoring model expects, the
//! checks every request goes through, and the two request flows (scale and
//! predict) in terms of the [`traits::Predictor`] and [`traits::Scaler`]
//! capabilities.

pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scale;
pub mod traits;
pub mod validation;

pub use error::{PipelineError, PredictorError, ScaleError};
pub use features::FeatureVector;
pub use model::{Feature, FeatureRecord, FormDraft, PredictionResult};
pub use validation::ValidationError;
