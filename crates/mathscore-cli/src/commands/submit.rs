//! The `mathscore submit` command.

use anyhow::{Context, Result};
use serde_json::Value;

use mathscore_api::FormClient;
use mathscore_core::model::FormDraft;

use super::FormArgs;

pub async fn execute(form: FormArgs, server: String, json: bool) -> Result<()> {
    let draft = FormDraft::from(form);
    let client = FormClient::new(&server)?;

    let response = client
        .submit(&draft)
        .await
        .with_context(|| format!("submission to {server} failed"))?;

    match serde_json::to_value(&response)? {
        Value::Object(map) => super::print_result(&map, json),
        other => anyhow::bail!("unexpected response shape: {other}"),
    }
}
