//! Tower middleware wrapped around the forwarding handlers.
//!
//! [`record_forward_failure`] is the next stop after a handler that failed
//! to reach its upstream: it picks the [`ForwardFailure`] out of the
//! response extensions, counts it and logs it with request context.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::proxy::forward::ForwardFailure;
use crate::proxy::RoutingService;

pub async fn record_forward_failure(
    State(routing): State<Arc<RoutingService>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if let Some(failure) = response.extensions().get::<ForwardFailure>() {
        routing.stats().failed.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            correlation_id = %failure.correlation_id,
            method = %method,
            path = %path,
            context = %failure.context,
            target = %failure.target,
            kind = failure.error.kind(),
            error = %failure.error,
            "forwarding failed"
        );
    }

    response
}
