//! Unified error types for Waypoint.
//!
//! [`WaypointError`] covers startup and CLI failures (config parsing,
//! invalid headers, address parsing, health checks). [`ForwardError`]
//! covers failures of a single proxied request; those never stop the
//! server and are reported to the client as a fixed generic body.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WaypointError {
    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

/// Failure of one forwarded request, after the route has been matched.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ForwardError {
    #[error("invalid upstream URI '{uri}': {source}")]
    InvalidUpstreamUri {
        uri: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("failed to build upstream request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

impl ForwardError {
    /// Short machine-friendly label used in logs and failure records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUpstreamUri { .. } => "invalid_uri",
            Self::RequestBuild(_) => "request_build",
            Self::Transport(e) if e.is_connect() => "connect",
            Self::Transport(_) => "transport",
        }
    }
}
