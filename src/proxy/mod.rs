//! Context-prefix forwarding.
//!
//! [`RoutingService`] owns everything the forwarding handlers share: the
//! memoized config loader, the outbound [`HeaderInjector`], the one-time
//! initialization guard, the lifecycle hooks, the HTTP client and the
//! request counters. It is built once at startup and shared as
//! `Arc<RoutingService>`.
//!
//! Submodules handle path rewriting ([`rewrite`]), outbound headers
//! ([`headers`]), hook definitions ([`hooks`]), router registration
//! ([`install`]) and the per-request pipeline ([`forward`]).

pub mod forward;
pub mod headers;
pub mod hooks;
pub mod install;
pub mod rewrite;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;
use tokio::sync::OnceCell;

use crate::config::model::ProxyConfig;
use crate::config::ConfigLoader;
use crate::error::WaypointError;
use crate::server::{HttpClient, Stats};
use forward::ForwardOptions;
use headers::HeaderInjector;
use hooks::{HeaderHandle, LifecycleHooks, NoopHooks};

pub struct RoutingService {
    loader: ConfigLoader,
    headers: HeaderInjector,
    initialized: OnceCell<()>,
    hooks: Arc<dyn LifecycleHooks>,
    options: ForwardOptions,
    client: HttpClient,
    stats: Stats,
}

impl RoutingService {
    /// Build a service with its own HTTP client, configured from `options`.
    pub fn new(loader: ConfigLoader, options: ForwardOptions) -> Result<Self, WaypointError> {
        let client = crate::server::build_http_client(options.verify_tls)?;
        Ok(Self::with_client(loader, options, client))
    }

    #[must_use]
    pub fn with_client(loader: ConfigLoader, options: ForwardOptions, client: HttpClient) -> Self {
        Self {
            loader,
            headers: HeaderInjector::new(),
            initialized: OnceCell::new(),
            hooks: Arc::new(NoopHooks),
            options,
            client,
            stats: Stats::new(),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub async fn config(&self) -> Result<Arc<ProxyConfig>, WaypointError> {
        self.loader.load().await
    }

    /// Load the config and seed the header set, exactly once.
    pub async fn ensure_initialized(&self) -> Result<(), WaypointError> {
        self.initialized
            .get_or_try_init(|| async {
                let config = self.loader.load().await?;
                for (key, value) in &config.headers {
                    if let Err(e) = self.headers.append(key, value).await {
                        tracing::warn!(header = %key, error = %e, "skipping configured header");
                    }
                }
                tracing::debug!(headers = config.headers.len(), "outbound headers seeded");
                Ok::<_, WaypointError>(())
            })
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Add or replace an outbound header for all subsequent requests.
    pub async fn append_header(&self, key: &str, value: &str) -> Result<(), WaypointError> {
        self.ensure_initialized().await?;
        self.headers.append(key, value).await?;
        tracing::info!(header = %key, "outbound header set");
        Ok(())
    }

    pub async fn current_headers(&self) -> HeaderMap {
        self.headers.snapshot().await
    }

    /// Initialize and register one forwarding handler per configured route.
    pub async fn install_routes<S>(self: &Arc<Self>, router: Router<S>) -> Result<Router<S>, WaypointError>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.ensure_initialized().await?;
        let config = self.config().await?;
        Ok(install::install(router, self, &config.routes))
    }

    /// Signal readiness: initialize if needed, then fire `on_ready`.
    pub async fn ready(self: &Arc<Self>) -> Result<(), WaypointError> {
        self.ensure_initialized().await?;
        self.hooks.on_ready(HeaderHandle::new(Arc::clone(self)));
        Ok(())
    }

    #[must_use]
    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    #[must_use]
    pub(crate) const fn headers(&self) -> &HeaderInjector {
        &self.headers
    }

    #[must_use]
    pub fn hooks(&self) -> &dyn LifecycleHooks {
        &*self.hooks
    }

    #[must_use]
    pub const fn options(&self) -> &ForwardOptions {
        &self.options
    }

    #[must_use]
    pub const fn client(&self) -> &HttpClient {
        &self.client
    }

    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }
}
