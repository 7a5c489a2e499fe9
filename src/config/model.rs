//! Data structures for the proxy configuration.
//!
//! [`ProxyConfig`] is the normalized result every config source produces:
//! the fixed outbound headers plus the ordered list of [`RouteEntry`]
//! values. [`ProxyFile`] and [`ForwardEntry`] mirror the on-disk JSON
//! store and are only used while parsing.

use serde::{Deserialize, Serialize};

/// Fixed outbound headers in configuration order. Later duplicates win
/// once applied to the header set.
pub type HeaderList = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// Structured `http-proxy.json` store.
    Json,
    /// Flat `proxy.*` keys from `application.properties` / `application.toml`.
    Flat,
}

impl ConfigOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Flat => "flat",
        }
    }
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One context-to-upstream mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub context: String,
    pub upstream_host: String,
    pub target_context: String,
}

impl RouteEntry {
    #[must_use]
    pub fn new(
        context: impl Into<String>,
        upstream_host: impl Into<String>,
        target_context: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            upstream_host: upstream_host.into(),
            target_context: target_context.into(),
        }
    }

    /// Inbound mount path, `/<context>`.
    #[must_use]
    pub fn mount_path(&self) -> String {
        format!("/{}", self.context)
    }

    /// Rewrite prefix, `/<target_context>`.
    #[must_use]
    pub fn target_context_path(&self) -> String {
        format!("/{}", self.target_context)
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub headers: HeaderList,
    pub routes: Vec<RouteEntry>,
    pub source: ConfigOrigin,
    pub fingerprint: String,
}

impl ProxyConfig {
    #[must_use]
    pub fn empty(source: ConfigOrigin, fingerprint: String) -> Self {
        Self {
            headers: Vec::new(),
            routes: Vec::new(),
            source,
            fingerprint,
        }
    }
}

/// A mapping as written in configuration, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ForwardEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(
        default,
        rename = "target-context",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_context: Option<String>,
}

/// Root of the structured JSON store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProxyFile {
    #[serde(default)]
    pub headers: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub forward: serde_json::Map<String, serde_json::Value>,
}
