//! Registration of forwarding handlers on an axum [`Router`].
//!
//! Each route is nested at `/<context>`, which matches `/<context>`,
//! `/<context>/` and every path below it. The router strips the prefix
//! before the handler sees the request. Paths that match no context fall
//! through to the router's other routes and its fallback.

use std::sync::Arc;

use axum::Router;

use super::forward::{ForwardHandler, ResolvedRoute};
use super::RoutingService;
use crate::config::model::RouteEntry;

/// Routes to register, in order. A later entry for a context replaces the
/// earlier one.
#[must_use]
pub fn select_routes(routes: &[RouteEntry]) -> Vec<&RouteEntry> {
    let mut selected: Vec<&RouteEntry> = Vec::with_capacity(routes.len());
    for route in routes {
        if route.context.is_empty() || route.upstream_host.is_empty() {
            tracing::debug!(context = %route.context, "route without context or upstream, skipping");
            continue;
        }
        if let Some(pos) = selected.iter().position(|r| r.context == route.context) {
            tracing::warn!(
                context = %route.context,
                replaced = %selected[pos].upstream_host,
                upstream = %route.upstream_host,
                "duplicate context, last registration wins"
            );
            selected.remove(pos);
        }
        selected.push(route);
    }
    selected
}

pub fn install<S>(router: Router<S>, service: &Arc<RoutingService>, routes: &[RouteEntry]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    select_routes(routes)
        .into_iter()
        .fold(router, |router, entry| {
            let resolved = ResolvedRoute::new(entry.clone());
            tracing::info!(
                context = %entry.context,
                upstream = %entry.upstream_host,
                target = %resolved.target_url,
                "proxy mapping installed"
            );
            let handler = ForwardHandler::new(Arc::clone(service), resolved);
            router.nest_service(&entry.mount_path(), handler.into_service())
        })
}
