//! `waypoint run`: start the proxy server.
//!
//! Loads the proxy configuration once, installs one forwarding handler
//! per mapping, signals readiness to the lifecycle hooks and serves
//! until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::{ConfigLoader, ConfigLocation};
use crate::error::WaypointError;
use crate::logging;
use crate::proxy::RoutingService;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), WaypointError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let loader = ConfigLoader::new(ConfigLocation::new(&args.config_dir));
    let routing = Arc::new(RoutingService::new(loader, args.forward_options())?);

    // Fail fast on a malformed config, before binding the listener.
    let config = routing.config().await?;
    let state = Arc::new(AppState::new(Arc::clone(&routing)));
    let router = server::build_router(state, args.max_body).await?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    routing.ready().await?;
    tracing::info!(
        addr = %addr,
        config_dir = %args.config_dir.display(),
        source = %config.source,
        routes = config.routes.len(),
        verify_tls = routing.options().verify_tls,
        "waypoint started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("waypoint stopped");
    Ok(())
}
