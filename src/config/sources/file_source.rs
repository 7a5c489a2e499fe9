//! Generic async file-based config source with SHA256 fingerprinting.
//!
//! [`FileSource`] implements [`ConfigSource`] for any on-disk format by
//! accepting a parse function at construction time. It reads the file
//! asynchronously via Tokio, hands the text to the parser, and records
//! a SHA256 fingerprint of the raw content.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{sha256_hex, ParsedConfig};
use crate::config::model::{ConfigOrigin, ProxyConfig};
use crate::config::ConfigSource;
use crate::error::WaypointError;

pub type ParseFn = fn(&str) -> Result<ParsedConfig, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    origin: ConfigOrigin,
    parse: ParseFn,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, origin: ConfigOrigin, parse: ParseFn) -> Self {
        Self {
            path,
            name,
            origin,
            parse,
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<ProxyConfig, WaypointError> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        let (headers, routes) =
            (self.parse)(&content).map_err(|e| WaypointError::ConfigParse {
                path: self.path.display().to_string(),
                source: e,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            source = self.name,
            routes = routes.len(),
            headers = headers.len(),
            "config file parsed"
        );

        Ok(ProxyConfig {
            headers,
            routes,
            source: self.origin,
            fingerprint: sha256_hex(content.as_bytes()),
        })
    }
}
