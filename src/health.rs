//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, config source metadata, installed route and header
//! counts, and cumulative request statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::proxy::install::select_routes;
use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub fingerprint: String,
    pub routes: usize,
    pub headers: usize,
    pub contexts: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let routing = &state.routing;
    let Some(config) = routing.loader().get() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let contexts: Vec<String> = select_routes(&config.routes)
        .into_iter()
        .map(|r| r.context.clone())
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: config.source.to_string(),
            fingerprint: config
                .fingerprint
                .get(..8)
                .unwrap_or(&config.fingerprint)
                .to_string(),
            routes: contexts.len(),
            headers: routing.headers().len().await,
            contexts,
        },
        stats: StatsResponse {
            requests_forwarded: routing.stats().forwarded.load(Ordering::Relaxed),
            requests_failed: routing.stats().failed.load(Ordering::Relaxed),
        },
    })
    .into_response()
}
