//! mathscore-predictor — External scoring procedure integration.
//!
//! Implements the `Predictor` and `Scaler` traits on top of subprocesses,
//! provides a mock predictor for tests, and loads the service configuration.

pub mod config;
pub mod mock;
pub mod process;
pub mod script;

pub use config::{
    create_predictor, create_scaler, load_config_from, MathscoreConfig,
    PredictorConfig, ScalerConfig, ServerConfig,
};
pub use mock::MockPredictor;
pub use process::ProcedureCommand;
pub use script::{ScriptPredictor, ScriptScaler};
