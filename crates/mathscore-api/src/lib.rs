//! mathscore-api — HTTP surface of the prediction pipeline.
//!
//! Serves the scale (`/validate`) and predict (`/predict`) endpoints over
//! axum, and provides [`client::FormClient`] for driving a running server.

pub mod client;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mathscore_core::traits::{Predictor, Scaler};

pub use client::{ClientError, FormClient, PredictionResponse};
pub use error::ApiError;

/// Shared state accessible by all handlers.
///
/// Holds only immutable capabilities; nothing is carried between requests.
#[derive(Clone)]
pub struct ApiState {
    /// External scoring procedure.
    pub predictor: Arc<dyn Predictor>,
    /// Scale stage implementation.
    pub scaler: Arc<dyn Scaler>,
    /// When the service started.
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(predictor: Arc<dyn Predictor>, scaler: Arc<dyn Scaler>) -> Self {
        Self {
            predictor,
            scaler,
            started_at: Utc::now(),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: ApiState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(parse_origins(cors_origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    handlers::api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse configured CORS origins, skipping (and reporting) invalid ones.
fn parse_origins(cors_origins: &[String]) -> Vec<HeaderValue> {
    let mut origins = Vec::with_capacity(cors_origins.len());
    for origin in cors_origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(e) => tracing::warn!(origin = %origin.escape_debug(), "ignoring invalid CORS origin: {e}"),
        }
    }
    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, cross-origin requests will be refused");
    }
    origins
}

/// Serve until Ctrl-C.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    cors_origins: &[String],
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(
        predictor = state.predictor.name(),
        scaler = state.scaler.name(),
        "listening on http://{addr}"
    );

    axum::serve(listener, build_router(state, cors_origins))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::warn!("failed to listen for Ctrl-C, running until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}
