//! Per-route forwarding handler.
//!
//! A [`ForwardHandler`] is nested under one context prefix. For every
//! request it captures the inbound request, rewrites the path onto the
//! route's target context, applies the configured headers and sends the
//! request through the shared client. The upstream response is streamed
//! back without buffering.
//!
//! On a transport failure the client gets `502` with
//! [`FORWARD_ERROR_BODY`], [`LifecycleHooks::on_error`](super::hooks::LifecycleHooks::on_error)
//! fires, and a [`ForwardFailure`] is attached to the response extensions
//! for the surrounding middleware.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, OriginalUri, Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, MethodRouter};
use url::Url;

use super::headers::{apply_forwarded, strip_hop_by_hop, ForwardedFor};
use super::hooks::InboundRequest;
use super::rewrite;
use super::RoutingService;
use crate::config::model::RouteEntry;
use crate::error::ForwardError;

/// Body sent to the client on any transport failure. Upstream details are
/// never included.
pub const FORWARD_ERROR_BODY: &str =
    "Something went wrong. And we are reporting a custom error message.";

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Per-request forwarding behavior, shared by all routes.
///
/// Requests are always sent in origin form: the upstream is addressed
/// directly, never as another proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOptions {
    /// Add `X-Forwarded-For/Proto/Host/Port`.
    pub xfwd: bool,
    /// Prepend the route's target context to the request path.
    pub prepend_path: bool,
    /// Verify upstream TLS certificates. Applied when the client is built.
    pub verify_tls: bool,
    /// Replace the inbound `Host` with the upstream authority.
    pub change_origin: bool,
    /// Point `Location` headers that name the upstream back at the inbound host.
    pub rewrite_redirects: bool,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            xfwd: true,
            prepend_path: true,
            verify_tls: false,
            change_origin: false,
            rewrite_redirects: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardStage {
    Received,
    Rewritten,
    Dispatched,
    Completed,
    Failed,
}

impl fmt::Display for ForwardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::Rewritten => "rewritten",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Response extension describing a failed forward.
#[derive(Debug, Clone)]
pub struct ForwardFailure {
    pub context: String,
    pub target: String,
    pub correlation_id: String,
    pub error: Arc<ForwardError>,
}

/// A route with its per-registration values precomputed.
#[derive(Debug)]
pub struct ResolvedRoute {
    pub entry: RouteEntry,
    pub target_path: String,
    pub target_url: String,
    upstream: Option<Url>,
}

impl ResolvedRoute {
    #[must_use]
    pub fn new(entry: RouteEntry) -> Self {
        let target_path = rewrite::normalize_slashes(&entry.target_context_path());
        let target_url = rewrite::target_url(&entry.upstream_host, &target_path);
        let upstream = Url::parse(&entry.upstream_host).ok();
        Self {
            entry,
            target_path,
            target_url,
            upstream,
        }
    }

    fn is_upstream(&self, location: &Url) -> bool {
        self.upstream.as_ref().is_some_and(|u| {
            u.host_str() == location.host_str()
                && u.port_or_known_default() == location.port_or_known_default()
        })
    }
}

#[derive(Clone)]
pub struct ForwardHandler {
    service: Arc<RoutingService>,
    route: Arc<ResolvedRoute>,
}

impl ForwardHandler {
    #[must_use]
    pub fn new(service: Arc<RoutingService>, route: ResolvedRoute) -> Self {
        Self {
            service,
            route: Arc::new(route),
        }
    }

    #[must_use]
    pub fn route(&self) -> &ResolvedRoute {
        &self.route
    }

    /// The handler as an axum service, ready to be nested.
    pub fn into_service(self) -> MethodRouter {
        any(handle).with_state(self)
    }

    pub async fn forward(&self, request: Request) -> Response {
        let inbound = capture(&request);
        tracing::debug!(
            correlation_id = %inbound.correlation_id,
            stage = %ForwardStage::Received,
            context = %self.route.entry.context,
            "request captured"
        );

        let (parts, body) = request.into_parts();
        let raw = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let (path, query) = rewrite::split_path_and_query(raw);
        let prefix = if self.service.options().prepend_path {
            self.route.target_path.as_str()
        } else {
            ""
        };
        let upstream = rewrite::upstream_uri(
            &self.route.entry.upstream_host,
            &rewrite::rewrite(path, query, prefix),
        );

        tracing::info!(
            correlation_id = %inbound.correlation_id,
            stage = %ForwardStage::Rewritten,
            method = %inbound.method,
            from = %inbound.original_uri,
            to = %upstream,
            "forwarding request"
        );

        let result = self.dispatch(parts, body, &upstream, &inbound).await;
        let mut response = match result {
            Ok(response) => {
                self.service.stats().forwarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    correlation_id = %inbound.correlation_id,
                    stage = %ForwardStage::Completed,
                    status = response.status().as_u16(),
                    "upstream responded"
                );
                response
            }
            Err(error) => self.fail(error, &inbound),
        };

        if let Ok(value) = HeaderValue::from_str(&inbound.correlation_id) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        response
    }

    async fn dispatch(
        &self,
        parts: axum::http::request::Parts,
        body: Body,
        upstream: &str,
        inbound: &InboundRequest,
    ) -> Result<Response, ForwardError> {
        let options = self.service.options();
        let uri: Uri = upstream
            .parse()
            .map_err(|source| ForwardError::InvalidUpstreamUri {
                uri: upstream.to_string(),
                source,
            })?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if options.change_origin {
            // The client fills Host from the URI when it is absent.
            headers.remove(header::HOST);
        }
        if options.xfwd {
            let host = inbound
                .host
                .as_deref()
                .and_then(|h| HeaderValue::from_str(h).ok());
            apply_forwarded(
                &mut headers,
                &ForwardedFor {
                    client_ip: inbound.client_addr.map(|a| a.ip()),
                    proto: inbound.original_uri.scheme_str().unwrap_or("http"),
                    host: host.as_ref(),
                },
            );
        }
        if !headers.contains_key(CORRELATION_HEADER) {
            if let Ok(value) = HeaderValue::from_str(&inbound.correlation_id) {
                headers.insert(CORRELATION_HEADER, value);
            }
        }
        self.service.headers().apply(&mut headers).await;

        let mut outbound = axum::http::Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)?;
        *outbound.headers_mut() = headers;

        self.service.hooks().on_request(&mut outbound, inbound, options);
        tracing::debug!(
            correlation_id = %inbound.correlation_id,
            stage = %ForwardStage::Dispatched,
            "request dispatched"
        );

        let upstream_response = self.service.client().request(outbound).await?;
        let (parts, body) = upstream_response.into_parts();
        let mut response = Response::from_parts(parts, Body::new(body));
        strip_hop_by_hop(response.headers_mut());

        if options.rewrite_redirects && response.status().is_redirection() {
            self.rewrite_location(&mut response, inbound);
        }

        self.service.hooks().on_response(&mut response, inbound);
        Ok(response)
    }

    fn rewrite_location(&self, response: &mut Response, inbound: &InboundRequest) {
        let Some(host) = inbound.host.as_deref() else {
            return;
        };
        let Some(location) = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Url::parse(v).ok())
        else {
            return;
        };
        if !self.route.is_upstream(&location) {
            return;
        }

        let proto = inbound.original_uri.scheme_str().unwrap_or("http");
        let rewritten = format!("{proto}://{host}{}", &location[url::Position::BeforePath..]);
        if let Ok(value) = HeaderValue::from_str(&rewritten) {
            tracing::debug!(from = %location, to = %rewritten, "rewrote redirect location");
            response.headers_mut().insert(header::LOCATION, value);
        }
    }

    fn fail(&self, error: ForwardError, inbound: &InboundRequest) -> Response {
        tracing::warn!(
            correlation_id = %inbound.correlation_id,
            stage = %ForwardStage::Failed,
            context = %self.route.entry.context,
            target = %self.route.target_url,
            kind = error.kind(),
            error = %error,
            "upstream request failed"
        );
        self.service.hooks().on_error(&error, inbound);

        let mut response = (StatusCode::BAD_GATEWAY, FORWARD_ERROR_BODY).into_response();
        response.extensions_mut().insert(ForwardFailure {
            context: self.route.entry.context.clone(),
            target: self.route.target_url.clone(),
            correlation_id: inbound.correlation_id.clone(),
            error: Arc::new(error),
        });
        response
    }
}

async fn handle(State(handler): State<ForwardHandler>, request: Request) -> Response {
    handler.forward(request).await
}

fn capture(request: &Request) -> InboundRequest {
    let headers = request.headers().clone();
    let correlation_id = headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let original_uri = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().clone(), |o| o.0.clone());
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);

    InboundRequest {
        method: request.method().clone(),
        original_uri,
        headers,
        host,
        client_addr,
        correlation_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_route_precomputes_target() {
        let route = ResolvedRoute::new(RouteEntry::new("api", "http://backend:8080", "v1"));
        assert_eq!(route.target_path, "/v1");
        assert_eq!(route.target_url, "http://backend:8080/v1");
    }

    #[test]
    fn upstream_detection_uses_default_ports() {
        let route = ResolvedRoute::new(RouteEntry::new("api", "http://backend", "api"));
        assert!(route.is_upstream(&Url::parse("http://backend:80/login").unwrap()));
        assert!(!route.is_upstream(&Url::parse("http://elsewhere/login").unwrap()));
        assert!(!route.is_upstream(&Url::parse("https://backend/login").unwrap()));
    }

    #[test]
    fn default_options() {
        let options = ForwardOptions::default();
        assert!(options.xfwd);
        assert!(options.prepend_path);
        assert!(!options.verify_tls);
        assert!(!options.change_origin);
    }
}
