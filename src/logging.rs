//! Tracing subscriber setup.
//!
//! Forwarding logs carry the correlation id as a structured field, so the
//! JSON output is the one meant for log shippers. Pretty output is picked
//! automatically on a terminal.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// `--json` beats `--pretty`, which beats TTY detection.
#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    match (json, pretty) {
        (true, _) => LogFormat::Json,
        (false, true) => LogFormat::Pretty,
        (false, false) if std::io::IsTerminal::is_terminal(&std::io::stdout()) => {
            LogFormat::Pretty
        }
        (false, false) => LogFormat::Json,
    }
}

/// Per-target filter. The upstream client and TLS internals are capped at
/// `warn`; connection errors already surface as forwarding failures.
#[must_use]
pub fn targets(level: Level) -> Targets {
    let quiet = level.min(Level::WARN);
    Targets::new()
        .with_default(level)
        .with_target("hyper_util", quiet)
        .with_target("rustls", quiet)
}

/// Install the global subscriber. Must be called at most once per process.
pub fn init(level: &LogLevel, format: LogFormat) {
    let output = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(output.with_filter(targets(level.to_tracing_level())))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(false, true), LogFormat::Json);
        assert_eq!(resolve_format(true, true), LogFormat::Json);
    }

    #[test]
    fn pretty_flag_forces_pretty() {
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn client_internals_stay_quiet() {
        let filter = targets(Level::DEBUG);
        assert!(filter.would_enable("waypoint::proxy::forward", &Level::DEBUG));
        assert!(!filter.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(filter.would_enable("rustls::conn", &Level::WARN));
    }

    #[test]
    fn quiet_targets_follow_stricter_levels() {
        let filter = targets(Level::ERROR);
        assert!(!filter.would_enable("hyper_util::client", &Level::WARN));
        assert!(filter.would_enable("hyper_util::client", &Level::ERROR));
    }
}
