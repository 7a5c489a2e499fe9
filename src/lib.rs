//! Waypoint is a configuration-driven reverse-proxy routing layer.
//!
//! It reads context-to-upstream mappings and a set of fixed outbound
//! headers from configuration, nests one forwarding handler per context
//! on an axum router, and rewrites each matched request onto the
//! upstream's target context before sending it through a shared,
//! connection-pooled hyper client.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, health).
//! - [`config`] -- Config source selection, the memoized
//!   [`ConfigLoader`](config::ConfigLoader), and mapping normalization.
//! - [`error`] -- Error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Failure recording around the forwarding handlers.
//! - [`proxy`] -- The [`RoutingService`](proxy::RoutingService), path
//!   rewriting, header injection, lifecycle hooks, route installation and
//!   the per-request forwarding pipeline.
//! - [`server`] -- Router assembly, shared state, HTTP client, and
//!   graceful shutdown.
//!
//! # Embedding
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use waypoint::config::{ConfigLoader, ConfigLocation};
//! use waypoint::proxy::forward::ForwardOptions;
//! use waypoint::proxy::RoutingService;
//!
//! # async fn example() -> Result<(), waypoint::error::WaypointError> {
//! let loader = ConfigLoader::new(ConfigLocation::new("config"));
//! let routing = Arc::new(RoutingService::new(loader, ForwardOptions::default())?);
//! let app = routing.install_routes(axum::Router::<()>::new()).await?;
//! routing.append_header("X-Deployment", "blue").await?;
//! routing.ready().await?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
