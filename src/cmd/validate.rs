//! `waypoint validate`: load a config directory and report the result.
//!
//! Resolves the config source exactly as `run` would, then prints the
//! routes that would be installed, as human-readable text or JSON.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::validation;
use crate::config::{ConfigLoader, ConfigLocation};
use crate::error::WaypointError;
use crate::proxy::install::select_routes;
use crate::proxy::rewrite::target_url;

pub async fn execute(args: &ValidateArgs) -> Result<(), WaypointError> {
    let location = ConfigLocation::new(&args.config_dir);
    let loader = ConfigLoader::new(location);

    let config = match loader.load().await {
        Ok(config) => config,
        Err(e) => {
            match args.format {
                ValidateFormat::Text => {
                    eprintln!("\u{2717} {}\n\n{e}", args.config_dir.display());
                }
                ValidateFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({ "valid": false, "error": e.to_string() })
                    );
                }
            }
            return Err(e);
        }
    };

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(
                    &args.config_dir.display().to_string(),
                    &config
                )
            );
        }
        ValidateFormat::Json => {
            let routes: Vec<serde_json::Value> = select_routes(&config.routes)
                .into_iter()
                .map(|r| {
                    serde_json::json!({
                        "context": r.context,
                        "upstream": r.upstream_host,
                        "target": target_url(&r.upstream_host, &r.target_context_path()),
                    })
                })
                .collect();
            let headers: Vec<&str> = config.headers.iter().map(|(k, _)| k.as_str()).collect();
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "source": config.source,
                    "fingerprint": config.fingerprint,
                    "routes": routes,
                    "headers": headers,
                })
            );
        }
    }

    Ok(())
}
