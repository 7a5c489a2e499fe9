//! Lifecycle hooks invoked by the forwarding pipeline.
//!
//! Implement [`LifecycleHooks`] and pass it to
//! [`RoutingService::with_hooks`](super::RoutingService::with_hooks).
//! Every method has a no-op default, so implementors override only the
//! events they care about. Hooks run synchronously on the request task
//! and must not block.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Uri};
use axum::response::Response;

use super::forward::ForwardOptions;
use super::RoutingService;
use crate::error::{ForwardError, WaypointError};

/// Snapshot of the inbound request taken before it is forwarded.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// URI as received, before the context prefix was stripped.
    pub original_uri: Uri,
    pub headers: HeaderMap,
    pub host: Option<String>,
    pub client_addr: Option<SocketAddr>,
    pub correlation_id: String,
}

pub trait LifecycleHooks: Send + Sync {
    /// Called after the outbound request is fully built, right before it is
    /// sent. Header changes made here reach the upstream.
    fn on_request(
        &self,
        _outbound: &mut Request<Body>,
        _inbound: &InboundRequest,
        _options: &ForwardOptions,
    ) {
    }

    /// Called when the upstream response head arrives, before it is streamed
    /// back to the client.
    fn on_response(&self, _upstream: &mut Response, _inbound: &InboundRequest) {}

    /// Called when forwarding fails at the transport level.
    fn on_error(&self, _error: &ForwardError, _inbound: &InboundRequest) {}

    /// Called once the routing layer is initialized and ready to serve.
    fn on_ready(&self, _headers: HeaderHandle) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Cloneable handle to [`RoutingService::append_header`], handed to
/// [`LifecycleHooks::on_ready`].
#[derive(Clone)]
pub struct HeaderHandle {
    service: Arc<RoutingService>,
}

impl HeaderHandle {
    pub(crate) fn new(service: Arc<RoutingService>) -> Self {
        Self { service }
    }

    pub async fn append(&self, key: &str, value: &str) -> Result<(), WaypointError> {
        self.service.append_header(key, value).await
    }
}

impl std::fmt::Debug for HeaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderHandle").finish_non_exhaustive()
    }
}
