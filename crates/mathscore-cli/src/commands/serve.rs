//! The `mathscore serve` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use mathscore_api::ApiState;
use mathscore_predictor::config::load_config_from;
use mathscore_predictor::{create_predictor, create_scaler};

pub async fn execute(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let predictor = create_predictor(&config.predictor);
    let scaler = create_scaler(&config.scaler);
    tracing::info!(
        command = %config.predictor.command,
        timeout_secs = config.predictor.timeout_secs,
        "predictor configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    mathscore_api::serve(
        listener,
        ApiState::new(predictor, scaler),
        &config.server.cors_origins,
    )
    .await
}
