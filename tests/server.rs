//! Integration tests for the HTTP server, health endpoint, passthrough and
//! graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use waypoint::config::model::{ConfigOrigin, ProxyConfig, RouteEntry};
use waypoint::config::{ConfigLoader, ConfigLocation};
use waypoint::health::HealthResponse;
use waypoint::proxy::forward::ForwardOptions;
use waypoint::proxy::RoutingService;
use waypoint::server::{self, AppState};

fn test_config() -> ProxyConfig {
    ProxyConfig {
        headers: vec![("X-Env".into(), "test".into())],
        routes: vec![
            RouteEntry::new("api", "http://localhost:19999", "v1"),
            RouteEntry::new("ghost", "", "ghost"),
        ],
        source: ConfigOrigin::Json,
        fingerprint: "0123456789abcdef".into(),
    }
}

async fn start_test_server(loader: ConfigLoader) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let routing = Arc::new(RoutingService::new(loader, ForwardOptions::default()).unwrap());
    let state = Arc::new(AppState::new(routing));
    let router = server::build_router(state, None).await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

#[tokio::test]
async fn health_endpoint_returns_healthy() {
    let (addr, shutdown) = start_test_server(ConfigLoader::preloaded(test_config())).await;

    let url = format!("http://{addr}/health");
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.config.source, "json");
    assert_eq!(health.config.fingerprint, "01234567");
    assert_eq!(health.config.routes, 1);
    assert_eq!(health.config.contexts, vec!["api".to_string()]);
    assert_eq!(health.config.headers, 1);
    assert_eq!(health.stats.requests_forwarded, 0);
    assert_eq!(health.stats.requests_failed, 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unmatched_context_falls_through_to_404() {
    let (addr, shutdown) = start_test_server(ConfigLoader::preloaded(test_config())).await;

    let resp = reqwest::get(format!("http://{addr}/nonexistent/path")).await.unwrap();
    assert_eq!(resp.status(), 404);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn route_without_upstream_is_not_installed() {
    let (addr, shutdown) = start_test_server(ConfigLoader::preloaded(test_config())).await;

    let resp = reqwest::get(format!("http://{addr}/ghost/anything")).await.unwrap();
    assert_eq!(resp.status(), 404);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn missing_config_files_install_no_routes() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::new(ConfigLocation::new(dir.path()));
    let (addr, shutdown) = start_test_server(loader).await;

    let resp = reqwest::get(format!("http://{addr}/api/users")).await.unwrap();
    assert_eq!(resp.status(), 404);

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.config.source, "flat");
    assert_eq!(health.config.routes, 0);
    assert_eq!(health.config.headers, 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn malformed_config_fails_router_build() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("http-proxy.json"), "{ not json").unwrap();

    let loader = ConfigLoader::new(ConfigLocation::new(dir.path()));
    let routing = Arc::new(RoutingService::new(loader, ForwardOptions::default()).unwrap());
    let state = Arc::new(AppState::new(routing));

    let err = server::build_router(state, None).await.unwrap_err();
    assert!(err.to_string().contains("http-proxy.json"));
}

#[tokio::test]
async fn health_version_matches_crate() {
    let (addr, shutdown) = start_test_server(ConfigLoader::preloaded(test_config())).await;

    let url = format!("http://{addr}/health");
    let health: HealthResponse = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let (addr, shutdown) = start_test_server(ConfigLoader::preloaded(test_config())).await;

    let url = format!("http://{addr}/health");
    assert!(reqwest::get(&url).await.is_ok());

    let _ = shutdown.send(());
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let result = reqwest::get(&url).await;
    assert!(result.is_err());
}
