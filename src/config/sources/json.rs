//! Structured JSON store (`http-proxy.json`) backed by [`FileSource`].
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "headers": { "X-Env": "prod" },
//!   "forward": {
//!     "svc": { "context": "api", "server": "http://backend:8080", "target-context": "v1" }
//!   }
//! }
//! ```

use std::path::PathBuf;

use serde_json::Value;

use super::file_source::FileSource;
use super::ParsedConfig;
use crate::config::model::{ConfigOrigin, ForwardEntry, ProxyFile};
use crate::config::validation::normalize_routes;

#[must_use]
pub fn new(path: PathBuf) -> FileSource {
    FileSource::new(path, "json", ConfigOrigin::Json, parse)
}

/// Parse the JSON store into headers and normalized routes.
pub fn parse(content: &str) -> Result<ParsedConfig, Box<dyn std::error::Error + Send + Sync>> {
    let file: ProxyFile = serde_json::from_str(content)?;

    let mut headers = Vec::with_capacity(file.headers.len());
    for (name, value) in file.headers {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(format!("header '{name}' must be a string, got {other}").into());
            }
        };
        headers.push((name, value));
    }

    let mut forward = Vec::with_capacity(file.forward.len());
    for (name, value) in file.forward {
        let entry: ForwardEntry = serde_json::from_value(value)
            .map_err(|e| format!("forward entry '{name}': {e}"))?;
        forward.push((name, entry));
    }

    let routes = normalize_routes(forward.iter().map(|(n, e)| (n.as_str(), e)));
    Ok((headers, routes))
}
