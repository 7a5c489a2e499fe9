//! Flat key/value fallback store.
//!
//! Used when no structured store exists. Keys follow the `proxy.*`
//! convention:
//!
//! ```text
//! proxy.request.headers = env, build
//! proxy.request.header.env.key = X-Env
//! proxy.request.header.env.value = prod
//! proxy.mappings = svc
//! proxy.mapping.svc.context = api
//! proxy.mapping.svc.server = http://backend:8080
//! proxy.mapping.svc.target-context = v1
//! ```
//!
//! The keys are read from `application.properties`, or from a TOML file
//! whose nested tables are flattened into the same dotted names.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::file_source::FileSource;
use super::{sha256_hex, ParsedConfig};
use crate::config::model::{ConfigOrigin, ForwardEntry, HeaderList, ProxyConfig};
use crate::config::validation::normalize_routes;
use crate::config::ConfigSource;
use crate::error::WaypointError;

pub const HEADERS_KEY: &str = "proxy.request.headers";
pub const MAPPINGS_KEY: &str = "proxy.mappings";

/// Dotted configuration keys and their raw string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatKeys(HashMap<String, String>);

impl FlatKeys {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Items of a comma-separated list value, trimmed, empty items removed.
    #[must_use]
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatKeys {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Parse `key=value` / `key: value` lines. `#` and `!` start comments.
#[must_use]
pub fn parse_properties(content: &str) -> FlatKeys {
    let mut keys = FlatKeys::default();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        match line.find(['=', ':']) {
            Some(idx) => keys.insert(line[..idx].trim(), line[idx + 1..].trim()),
            None => keys.insert(line, ""),
        }
    }
    keys
}

/// Flatten a TOML document into dotted keys. Arrays join with commas.
#[cfg(feature = "toml")]
pub fn parse_toml(content: &str) -> Result<FlatKeys, toml::de::Error> {
    fn scalar(value: &toml::Value) -> Option<String> {
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Datetime(d) => Some(d.to_string()),
            toml::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(scalar)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            toml::Value::Table(_) => None,
        }
    }

    fn walk(prefix: &str, table: &toml::Table, out: &mut FlatKeys) {
        for (key, value) in table {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                toml::Value::Table(inner) => walk(&name, inner, out),
                other => {
                    if let Some(s) = scalar(other) {
                        out.insert(name, s);
                    }
                }
            }
        }
    }

    let table: toml::Table = content.parse()?;
    let mut keys = FlatKeys::default();
    walk("", &table, &mut keys);
    Ok(keys)
}

/// Expand the `proxy.*` lists into headers and normalized routes.
#[must_use]
pub fn resolve(keys: &FlatKeys) -> ParsedConfig {
    let mut headers: HeaderList = Vec::new();
    for item in keys.list(HEADERS_KEY) {
        let Some(name) = keys
            .get(&format!("proxy.request.header.{item}.key"))
            .filter(|k| !k.is_empty())
        else {
            tracing::warn!(header = %item, "header entry has no key, skipping");
            continue;
        };
        let value = keys
            .get(&format!("proxy.request.header.{item}.value"))
            .unwrap_or_default();
        headers.push((name.to_string(), value.to_string()));
    }

    let mappings: Vec<(&str, ForwardEntry)> = keys
        .list(MAPPINGS_KEY)
        .into_iter()
        .map(|item| {
            let lookup = |field: &str| {
                keys.get(&format!("proxy.mapping.{item}.{field}"))
                    .map(String::from)
            };
            let entry = ForwardEntry {
                context: lookup("context"),
                server: lookup("server"),
                target_context: lookup("target-context"),
            };
            (item, entry)
        })
        .collect();

    let routes = normalize_routes(mappings.iter().map(|(n, e)| (*n, e)));
    (headers, routes)
}

fn parse_properties_file(
    content: &str,
) -> Result<ParsedConfig, Box<dyn std::error::Error + Send + Sync>> {
    Ok(resolve(&parse_properties(content)))
}

#[cfg(feature = "toml")]
fn parse_toml_file(content: &str) -> Result<ParsedConfig, Box<dyn std::error::Error + Send + Sync>> {
    Ok(resolve(&parse_toml(content)?))
}

#[must_use]
pub fn properties(path: PathBuf) -> FileSource {
    FileSource::new(path, "properties", ConfigOrigin::Flat, parse_properties_file)
}

#[cfg(feature = "toml")]
#[must_use]
pub fn toml_file(path: PathBuf) -> FileSource {
    FileSource::new(path, "toml", ConfigOrigin::Flat, parse_toml_file)
}

/// Flat source used when no config file exists at all: no headers, no routes.
pub struct Unconfigured;

#[async_trait]
impl ConfigSource for Unconfigured {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn load(&self) -> Result<ProxyConfig, WaypointError> {
        Ok(ProxyConfig::empty(ConfigOrigin::Flat, sha256_hex(b"")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_syntax() {
        let keys = parse_properties(
            "# comment\n! also comment\n\nproxy.mappings = a, b\nproxy.mapping.a.server: http://a\nflag\n",
        );
        assert_eq!(keys.get("proxy.mappings"), Some("a, b"));
        assert_eq!(keys.get("proxy.mapping.a.server"), Some("http://a"));
        assert_eq!(keys.get("flag"), Some(""));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn value_keeps_later_separators() {
        let keys = parse_properties("proxy.mapping.a.server=http://a:8080/x=y");
        assert_eq!(keys.get("proxy.mapping.a.server"), Some("http://a:8080/x=y"));
    }

    #[test]
    fn list_trims_and_drops_empty_items() {
        let keys: FlatKeys = [(MAPPINGS_KEY, " a ,, b ,")].into_iter().collect();
        assert_eq!(keys.list(MAPPINGS_KEY), ["a", "b"]);
        assert!(keys.list("missing").is_empty());
    }

    #[test]
    fn resolves_headers_and_mappings() {
        let keys: FlatKeys = [
            (HEADERS_KEY, "env, nokey"),
            ("proxy.request.header.env.key", "X-Env"),
            ("proxy.request.header.env.value", "prod"),
            ("proxy.request.header.nokey.value", "ignored"),
            (MAPPINGS_KEY, "svc, orders, broken"),
            ("proxy.mapping.svc.context", "api"),
            ("proxy.mapping.svc.server", "http://backend:8080/"),
            ("proxy.mapping.svc.target-context", "v1"),
            ("proxy.mapping.orders.server", "http://orders"),
            ("proxy.mapping.broken.context", "nowhere"),
        ]
        .into_iter()
        .collect();

        let (headers, routes) = resolve(&keys);
        assert_eq!(headers, vec![("X-Env".to_string(), "prod".to_string())]);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].context, "api");
        assert_eq!(routes[0].upstream_host, "http://backend:8080");
        assert_eq!(routes[0].target_context, "v1");
        assert_eq!(routes[1].context, "orders");
        assert_eq!(routes[1].target_context, "orders");
    }

    #[test]
    fn no_mappings_key_yields_no_routes() {
        let (headers, routes) = resolve(&FlatKeys::default());
        assert!(headers.is_empty());
        assert!(routes.is_empty());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_tables_flatten_to_dotted_keys() {
        let keys = parse_toml(
            r#"
            [proxy]
            mappings = "svc"

            [proxy.mapping.svc]
            server = "http://backend:8080"
            target-context = "v1"
            "#,
        )
        .unwrap();
        assert_eq!(keys.get("proxy.mappings"), Some("svc"));
        assert_eq!(keys.get("proxy.mapping.svc.server"), Some("http://backend:8080"));
        assert_eq!(keys.get("proxy.mapping.svc.target-context"), Some("v1"));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_arrays_become_lists() {
        let keys = parse_toml("[proxy]\nmappings = [\"a\", \"b\"]\n").unwrap();
        assert_eq!(keys.list(MAPPINGS_KEY), ["a", "b"]);
    }
}
