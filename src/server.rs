//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the routing
//! service and uptime), [`build_router`] for installing the configured
//! mappings with their middleware layers, [`build_http_client`] for the
//! connection-pooled hyper client, and [`shutdown_signal`] for SIGTERM /
//! Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::WaypointError;
use crate::health::health_handler;
use crate::middleware::record_forward_failure;
use crate::proxy::install::install;
use crate::proxy::RoutingService;

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Body>;

pub struct AppState {
    pub routing: Arc<RoutingService>,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(routing: Arc<RoutingService>) -> Self {
        Self {
            routing,
            start_time: Instant::now(),
        }
    }
}

/// Accepts any upstream certificate chain. Handshake signatures are still
/// checked so the session keys belong to whoever presented the certificate.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Build the shared upstream client. One pool serves every route.
pub fn build_http_client(verify_tls: bool) -> Result<HttpClient, WaypointError> {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let builder = hyper_rustls::HttpsConnectorBuilder::new();
    let builder = if verify_tls {
        builder.with_webpki_roots()
    } else {
        tracing::debug!("upstream TLS certificate verification disabled");
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth();
        builder.with_tls_config(tls)
    };

    let https = builder.https_or_http().enable_http1().build();
    Ok(Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https))
}

/// Install the configured mappings plus `/health` on a fresh router.
///
/// Loads and initializes the routing configuration if that has not
/// happened yet, so a malformed config fails here rather than on the first
/// request. Request bodies are streamed to the upstream without a size cap
/// unless `max_body` is set.
pub async fn build_router(
    state: Arc<AppState>,
    max_body: Option<usize>,
) -> Result<Router, WaypointError> {
    let routing = Arc::clone(&state.routing);
    routing.ensure_initialized().await?;
    let config = routing.config().await?;

    let health_context = HEALTH_PATH.trim_start_matches('/');
    let mut router = Router::new();
    if config.routes.iter().any(|r| r.context == health_context) {
        tracing::warn!(
            context = health_context,
            "a proxy mapping uses the health path, health endpoint disabled"
        );
    } else {
        router = router.route(HEALTH_PATH, get(health_handler));
    }

    let router = install(router, &routing, &config.routes);
    let router = match max_body {
        Some(limit) => router.layer(RequestBodyLimitLayer::new(limit)),
        None => router,
    };

    Ok(router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    Arc::clone(&routing),
                    record_forward_failure,
                )),
        )
        .with_state(state))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
