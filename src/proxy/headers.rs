//! Outbound header handling.
//!
//! [`HeaderInjector`] holds the headers added to every proxied request.
//! It is read at send time, so headers appended after startup apply to
//! routes that are already installed. [`apply_forwarded`] adds the
//! `X-Forwarded-*` set and [`strip_hop_by_hop`] removes connection-level
//! headers in both directions.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::RwLock;

use crate::error::WaypointError;

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
        "proxy-connection",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Validate and convert a configured header pair.
pub fn parse_header(key: &str, value: &str) -> Result<(HeaderName, HeaderValue), WaypointError> {
    let name = key
        .parse::<HeaderName>()
        .map_err(|e| WaypointError::InvalidHeader {
            name: key.to_string(),
            reason: e.to_string(),
        })?;
    let value = HeaderValue::from_str(value).map_err(|e| WaypointError::InvalidHeader {
        name: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok((name, value))
}

/// Fixed headers applied to every outbound request. Last write wins.
#[derive(Debug, Default)]
pub struct HeaderInjector {
    headers: RwLock<HeaderMap>,
}

impl HeaderInjector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn append(&self, key: &str, value: &str) -> Result<(), WaypointError> {
        let (name, value) = parse_header(key, value)?;
        self.headers.write().await.insert(name, value);
        Ok(())
    }

    /// Copy of the current set.
    pub async fn snapshot(&self) -> HeaderMap {
        self.headers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.headers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.headers.read().await.is_empty()
    }

    /// Insert every current entry into `target`, overwriting by name.
    pub async fn apply(&self, target: &mut HeaderMap) {
        let headers = self.headers.read().await;
        for (name, value) in headers.iter() {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Client-side facts needed for the `X-Forwarded-*` headers.
#[derive(Debug, Clone, Copy)]
pub struct ForwardedFor<'a> {
    pub client_ip: Option<std::net::IpAddr>,
    pub proto: &'a str,
    pub host: Option<&'a HeaderValue>,
}

/// Append the client to `X-Forwarded-For` and fill in `X-Forwarded-Proto`,
/// `X-Forwarded-Host` and `X-Forwarded-Port` when not already present.
pub fn apply_forwarded(headers: &mut HeaderMap, forwarded: &ForwardedFor<'_>) {
    if let Some(ip) = forwarded.client_ip {
        let client_ip = ip.to_string();
        let xff = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || client_ip.clone(),
                |existing| format!("{existing}, {client_ip}"),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }
    }

    if !headers.contains_key("x-forwarded-proto") {
        if let Ok(val) = HeaderValue::from_str(forwarded.proto) {
            headers.insert("x-forwarded-proto", val);
        }
    }

    if let Some(host) = forwarded.host {
        if !headers.contains_key("x-forwarded-host") {
            headers.insert("x-forwarded-host", host.clone());
        }
        if !headers.contains_key("x-forwarded-port") {
            let port = host
                .to_str()
                .ok()
                .and_then(|h| h.rsplit_once(':'))
                .and_then(|(_, p)| p.parse::<u16>().ok())
                .unwrap_or(if forwarded.proto == "https" { 443 } else { 80 });
            headers.insert("x-forwarded-port", HeaderValue::from(port));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_is_last_write_wins() {
        let injector = HeaderInjector::new();
        injector.append("X-Env", "dev").await.unwrap();
        injector.append("x-env", "prod").await.unwrap();

        let headers = injector.snapshot().await;
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-env").unwrap(), "prod");
    }

    #[tokio::test]
    async fn apply_overwrites_outbound_values() {
        let injector = HeaderInjector::new();
        injector.append("x-tenant", "acme").await.unwrap();

        let mut outbound = HeaderMap::new();
        outbound.insert("x-tenant", "client-supplied".parse().unwrap());
        outbound.insert("accept", "*/*".parse().unwrap());
        injector.apply(&mut outbound).await;

        assert_eq!(outbound.get("x-tenant").unwrap(), "acme");
        assert_eq!(outbound.get("accept").unwrap(), "*/*");
    }

    #[tokio::test]
    async fn invalid_header_name_is_rejected() {
        let injector = HeaderInjector::new();
        let err = injector.append("bad header", "x").await.unwrap_err();
        assert!(matches!(err, WaypointError::InvalidHeader { .. }));
        assert!(injector.is_empty().await);
    }

    #[test]
    fn strips_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        strip_hop_by_hop(&mut headers);

        assert!(headers.get("connection").is_none());
        assert!(headers.get("content-type").is_some());
    }

    #[test]
    fn appends_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        let host: HeaderValue = "proxy.local:8080".parse().unwrap();

        apply_forwarded(
            &mut headers,
            &ForwardedFor {
                client_ip: Some("10.0.0.1".parse().unwrap()),
                proto: "http",
                host: Some(&host),
            },
        );

        assert_eq!(headers.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "proxy.local:8080");
        assert_eq!(headers.get("x-forwarded-port").unwrap(), "8080");
    }

    #[test]
    fn forwarded_port_defaults_from_proto() {
        let mut headers = HeaderMap::new();
        let host: HeaderValue = "proxy.local".parse().unwrap();
        apply_forwarded(
            &mut headers,
            &ForwardedFor {
                client_ip: None,
                proto: "http",
                host: Some(&host),
            },
        );

        assert!(headers.get("x-forwarded-for").is_none());
        assert_eq!(headers.get("x-forwarded-port").unwrap(), "80");
    }
}
