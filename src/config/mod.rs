//! Configuration loading for the routing layer.
//!
//! Defines the [`ConfigSource`] trait, the [`ConfigLocation`] that picks
//! a source by checking which files exist, and the memoizing
//! [`ConfigLoader`]. The structured JSON store wins when present;
//! otherwise the flat key/value store is used. A missing structured file
//! is never an error, a malformed one always is.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::WaypointError;
use model::ProxyConfig;

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const STRUCTURED_FILE: &str = "http-proxy.json";
pub const PROPERTIES_FILE: &str = "application.properties";
#[cfg(feature = "toml")]
pub const TOML_FILE: &str = "application.toml";

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<ProxyConfig, WaypointError>;
}

/// Directory holding the proxy configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLocation {
    dir: PathBuf,
}

impl Default for ConfigLocation {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl ConfigLocation {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn structured_path(&self) -> PathBuf {
        self.dir.join(STRUCTURED_FILE)
    }

    /// Pick the source to load from, by file existence only.
    pub async fn resolve_source(&self) -> Box<dyn ConfigSource> {
        let structured = self.structured_path();
        if exists(&structured).await {
            tracing::info!(path = %structured.display(), "using structured proxy config");
            return Box::new(sources::json::new(structured));
        }

        let properties = self.dir.join(PROPERTIES_FILE);
        if exists(&properties).await {
            tracing::info!(path = %properties.display(), "using flat proxy config");
            return Box::new(sources::flat::properties(properties));
        }

        #[cfg(feature = "toml")]
        {
            let toml_path = self.dir.join(TOML_FILE);
            if exists(&toml_path).await {
                tracing::info!(path = %toml_path.display(), "using flat proxy config");
                return Box::new(sources::flat::toml_file(toml_path));
            }
        }

        tracing::info!(
            dir = %self.dir.display(),
            "no proxy config files found, no routes will be installed"
        );
        Box::new(sources::flat::Unconfigured)
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Loads the [`ProxyConfig`] once and hands out the cached result afterwards.
///
/// Concurrent first calls are serialized by the cell: only one of them reads
/// configuration. A failed load leaves the cell empty so a later call retries.
#[derive(Debug)]
pub struct ConfigLoader {
    location: ConfigLocation,
    cell: OnceCell<Arc<ProxyConfig>>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(location: ConfigLocation) -> Self {
        Self {
            location,
            cell: OnceCell::new(),
        }
    }

    /// A loader that is already resolved, for embedding and tests.
    #[must_use]
    pub fn preloaded(config: ProxyConfig) -> Self {
        Self {
            location: ConfigLocation::default(),
            cell: OnceCell::new_with(Some(Arc::new(config))),
        }
    }

    #[must_use]
    pub fn location(&self) -> &ConfigLocation {
        &self.location
    }

    pub async fn load(&self) -> Result<Arc<ProxyConfig>, WaypointError> {
        let config = self
            .cell
            .get_or_try_init(|| async {
                let source = self.location.resolve_source().await;
                let config = source.load().await?;
                tracing::info!(
                    source = source.name(),
                    routes = config.routes.len(),
                    headers = config.headers.len(),
                    fingerprint = %config.fingerprint.get(..8).unwrap_or(&config.fingerprint),
                    "proxy config loaded"
                );
                Ok::<_, WaypointError>(Arc::new(config))
            })
            .await?;
        Ok(Arc::clone(config))
    }

    /// The cached config, if a load has succeeded.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ProxyConfig>> {
        self.cell.get().cloned()
    }
}
