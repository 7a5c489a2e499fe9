//! `waypoint health`: query `/health` on a running instance.
//!
//! Prints a short summary of the instance (uptime, config source,
//! installed contexts, request counters), or the raw JSON with `--json`.

use std::time::Duration;

use axum::body::Body;
use http_body_util::BodyExt;

use crate::cli::HealthArgs;
use crate::error::WaypointError;
use crate::health::HealthResponse;
use crate::server::{build_http_client, HEALTH_PATH};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

fn request_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> WaypointError {
    WaypointError::HttpRequest { source: e.into() }
}

pub async fn execute(args: HealthArgs) -> Result<(), WaypointError> {
    let url = format!("{}{HEALTH_PATH}", args.url.trim_end_matches('/'));
    let uri: hyper::Uri = url.parse().map_err(|e: http::uri::InvalidUri| {
        WaypointError::UriParse {
            source: Box::new(e),
        }
    })?;

    let client = build_http_client(true)?;
    let request = hyper::Request::get(uri)
        .body(Body::empty())
        .map_err(request_error)?;

    let response = tokio::time::timeout(HEALTH_TIMEOUT, client.request(request))
        .await
        .map_err(|_| request_error(format!("no answer from {url} within {HEALTH_TIMEOUT:?}")))?
        .map_err(request_error)?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(request_error)?
        .to_bytes();

    if !status.is_success() {
        return Err(WaypointError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    let health: HealthResponse = match serde_json::from_slice(&body) {
        Ok(health) => health,
        Err(e) => {
            eprintln!("unexpected health payload: {e}");
            println!("{}", String::from_utf8_lossy(&body));
            return Ok(());
        }
    };

    println!("\u{2713} waypoint is healthy ({})", args.url);
    println!("  version:   {}", health.version);
    println!("  uptime:    {}", format_uptime(health.uptime_seconds));
    println!(
        "  config:    {} (fingerprint {})",
        health.config.source, health.config.fingerprint
    );
    println!(
        "  routes:    {} [{}]",
        health.config.routes,
        health.config.contexts.join(", ")
    );
    println!("  headers:   {}", health.config.headers);
    println!(
        "  requests:  {} forwarded, {} failed",
        health.stats.requests_forwarded, health.stats.requests_failed
    );
    Ok(())
}

fn format_uptime(seconds: u64) -> String {
    match (seconds / 3600, (seconds % 3600) / 60, seconds % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, s) => format!("{h}h {m}m {s}s"),
    }
}
