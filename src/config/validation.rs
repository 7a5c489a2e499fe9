//! Normalization of raw mappings into [`RouteEntry`] values.
//!
//! [`normalize_routes`] applies the defaulting rules shared by every
//! config source (context falls back to the mapping name, target context
//! falls back to the context), strips trailing slashes from upstream
//! hosts, and drops mappings that cannot be installed. Dropped mappings
//! are logged, never reported as errors.

use url::Url;

use super::model::{ConfigOrigin, ForwardEntry, ProxyConfig, RouteEntry};

/// Characters the router treats as path parameters or wildcards.
const RESERVED_CONTEXT_CHARS: &[char] = &['*', '{', '}', '?', '#'];

/// Validate an upstream base URL. Returns `Ok(())` or a human-readable error.
pub fn validate_upstream(upstream: &str) -> Result<(), String> {
    match Url::parse(upstream) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.host_str().is_none() {
                Err(format!("'{upstream}' has no host"))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{upstream}' is not a valid URL")),
    }
}

/// Validate a context segment (already trimmed of surrounding slashes).
pub fn validate_context(context: &str) -> Result<(), String> {
    if context.is_empty() {
        return Err("context cannot be empty".into());
    }
    if let Some(c) = context.chars().find(|c| RESERVED_CONTEXT_CHARS.contains(c)) {
        return Err(format!("context cannot contain '{c}'"));
    }
    if context.split('/').any(str::is_empty) {
        return Err(format!(
            "context '{context}' contains an empty segment (did you mean '{}'?)",
            collapse_segments(context)
        ));
    }
    Ok(())
}

fn trim_slashes(value: &str) -> &str {
    value.trim().trim_matches('/')
}

fn collapse_segments(value: &str) -> String {
    value
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Apply defaults to one raw mapping. Returns `None` when the mapping is
/// skipped; the reason has already been logged.
#[must_use]
pub fn normalize_entry(name: &str, entry: &ForwardEntry) -> Option<RouteEntry> {
    let Some(server) = non_empty(entry.server.as_deref()) else {
        tracing::warn!(mapping = %name, "mapping has no server, skipping");
        return None;
    };
    let upstream_host = server.trim_end_matches('/').to_string();
    if let Err(reason) = validate_upstream(&upstream_host) {
        tracing::warn!(mapping = %name, server = %server, %reason, "invalid server, skipping");
        return None;
    }

    let context = non_empty(entry.context.as_deref())
        .map_or_else(|| trim_slashes(name), trim_slashes)
        .to_string();
    if let Err(reason) = validate_context(&context) {
        tracing::warn!(mapping = %name, %reason, "invalid context, skipping");
        return None;
    }

    let target_context = non_empty(entry.target_context.as_deref())
        .map(trim_slashes)
        .filter(|t| !t.is_empty())
        .unwrap_or(&context)
        .to_string();

    Some(RouteEntry {
        context,
        upstream_host,
        target_context,
    })
}

/// Normalize mappings in order, dropping the ones that cannot be installed.
#[must_use]
pub fn normalize_routes<'a, I>(entries: I) -> Vec<RouteEntry>
where
    I: IntoIterator<Item = (&'a str, &'a ForwardEntry)>,
{
    entries
        .into_iter()
        .filter_map(|(name, entry)| normalize_entry(name, entry))
        .collect()
}

#[must_use]
pub fn format_validation_report(location: &str, config: &ProxyConfig) -> String {
    let mut lines = vec![format!(
        "  source: {}, {} routes, {} headers\n",
        match config.source {
            ConfigOrigin::Json => "http-proxy.json",
            ConfigOrigin::Flat => "flat keys",
        },
        config.routes.len(),
        config.headers.len()
    )];

    for route in &config.routes {
        lines.push(format!(
            "  {}/  -> {}{}",
            route.mount_path(),
            route.upstream_host,
            route.target_context_path()
        ));
    }
    for (name, _) in &config.headers {
        lines.push(format!("  header: {name}"));
    }

    format!("{location} is valid\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(context: Option<&str>, server: Option<&str>, target: Option<&str>) -> ForwardEntry {
        ForwardEntry {
            context: context.map(Into::into),
            server: server.map(Into::into),
            target_context: target.map(Into::into),
        }
    }

    #[test]
    fn applies_defaults_from_name_and_context() {
        let route = normalize_entry("svc", &entry(None, Some("http://backend:8080"), None)).unwrap();
        assert_eq!(route.context, "svc");
        assert_eq!(route.target_context, "svc");

        let route =
            normalize_entry("svc", &entry(Some("api"), Some("http://backend:8080"), None)).unwrap();
        assert_eq!(route.context, "api");
        assert_eq!(route.target_context, "api");
    }

    #[test]
    fn keeps_explicit_target_context() {
        let route = normalize_entry(
            "svc",
            &entry(Some("/api/"), Some("http://backend:8080"), Some("/v1")),
        )
        .unwrap();
        assert_eq!(route.context, "api");
        assert_eq!(route.target_context, "v1");
    }

    #[test]
    fn strips_trailing_slashes_from_server() {
        let a = normalize_entry("a", &entry(None, Some("http://a/"), None)).unwrap();
        let b = normalize_entry("a", &entry(None, Some("http://a"), None)).unwrap();
        let c = normalize_entry("a", &entry(None, Some("http://a///"), None)).unwrap();
        assert_eq!(a.upstream_host, "http://a");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn missing_or_empty_server_is_skipped() {
        assert!(normalize_entry("a", &entry(Some("api"), None, None)).is_none());
        assert!(normalize_entry("a", &entry(Some("api"), Some("  "), None)).is_none());
    }

    #[test]
    fn non_http_server_is_skipped() {
        assert!(normalize_entry("a", &entry(None, Some("ftp://files"), None)).is_none());
        assert!(normalize_entry("a", &entry(None, Some("backend:8080"), None)).is_none());
    }

    #[test]
    fn wildcard_context_is_skipped() {
        assert!(normalize_entry("a", &entry(Some("api/*"), Some("http://b"), None)).is_none());
        assert!(normalize_entry("a", &entry(Some("{id}"), Some("http://b"), None)).is_none());
    }

    #[test]
    fn empty_segment_suggests_fix() {
        let err = validate_context("api//v2").unwrap_err();
        assert!(err.contains("did you mean 'api/v2'?"));
    }

    #[test]
    fn normalize_routes_preserves_order() {
        let a = entry(Some("a"), Some("http://a"), None);
        let skipped = entry(Some("b"), None, None);
        let c = entry(Some("c"), Some("http://c"), None);
        let routes = normalize_routes([("a", &a), ("b", &skipped), ("c", &c)]);
        let contexts: Vec<_> = routes.iter().map(|r| r.context.as_str()).collect();
        assert_eq!(contexts, ["a", "c"]);
    }
}
