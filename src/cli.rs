//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, health), and their associated argument
//! structs. Runtime flags have environment variable equivalents for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_DIR;
use crate::proxy::forward::ForwardOptions;

#[derive(Parser)]
#[command(
    name = "waypoint",
    version,
    about = "Configuration-driven context-prefix reverse proxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        waypoint run                          Start with ./config/http-proxy.json\n  \
        waypoint run --config-dir /etc/wp     Start with another config directory\n  \
        waypoint validate                     Print the resolved route table"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Load the config and print the resolved routes without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        waypoint run                                  Use ./config\n  \
        waypoint run --config-dir deploy -p 8080      Specific directory and port\n  \
        waypoint run --pretty -l debug                Local dev mode")]
pub struct RunArgs {
    /// Directory holding http-proxy.json or application.properties
    #[arg(long, env = "WAYPOINT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Forwarding --
    /// Verify upstream TLS certificates (off by default)
    #[arg(long, env = "VERIFY_UPSTREAM_TLS", help_heading = "Forwarding")]
    pub verify_upstream_tls: bool,

    /// Rewrite the Host header to the upstream authority
    #[arg(long, env = "CHANGE_ORIGIN", help_heading = "Forwarding")]
    pub change_origin: bool,

    /// Do not add X-Forwarded-* headers
    #[arg(long, help_heading = "Forwarding")]
    pub no_xfwd: bool,

    /// Leave upstream redirect Location headers untouched
    #[arg(long, help_heading = "Forwarding")]
    pub no_redirect_rewrite: bool,

    // -- Tuning --
    /// Reject request bodies larger than this many bytes (no limit when unset)
    #[arg(long, env = "MAX_BODY_SIZE", help_heading = "Tuning")]
    pub max_body: Option<usize>,
}

impl RunArgs {
    #[must_use]
    pub fn forward_options(&self) -> ForwardOptions {
        ForwardOptions {
            xfwd: !self.no_xfwd,
            verify_tls: self.verify_upstream_tls,
            change_origin: self.change_origin,
            rewrite_redirects: !self.no_redirect_rewrite,
            ..ForwardOptions::default()
        }
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config directory to validate
    #[arg(long, env = "WAYPOINT_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
