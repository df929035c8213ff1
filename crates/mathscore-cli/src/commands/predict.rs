//! The `mathscore predict` command.
//!
//! Runs both stages in-process against the configured procedures, without a
//! server.

use std::path::PathBuf;

use anyhow::Result;

use mathscore_core::model::FormDraft;
use mathscore_core::pipeline;
use mathscore_predictor::config::load_config_from;
use mathscore_predictor::{create_predictor, create_scaler};

use super::FormArgs;

pub async fn execute(form: FormArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let draft = FormDraft::from(form);
    draft.ensure_ready()?;

    let config = load_config_from(config_path.as_deref())?;
    let scaler = create_scaler(&config.scaler);
    let predictor = create_predictor(&config.predictor);

    let scaled = pipeline::scale(scaler.as_ref(), draft.to_payload()).await?;
    let merged = pipeline::predict(predictor.as_ref(), scaled).await?;

    super::print_result(&merged, json)
}
