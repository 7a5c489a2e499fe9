//! Subcommand implementations, one submodule each.

pub mod health;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::WaypointError;

const WELCOME: &str = "
  No command provided. To get started:

    waypoint run                        Start the proxy (reads ./config)
    waypoint run --config-dir <dir>     Start with another config directory
    waypoint validate                   Print the resolved route table
    waypoint health [url]               Query a running instance
    waypoint --help                     See all commands and options
";

pub async fn dispatch(cli: Cli) -> Result<(), WaypointError> {
    let Some(command) = cli.command else {
        println!(
            "\n  waypoint v{}: context-prefix reverse proxy\n{WELCOME}",
            env!("CARGO_PKG_VERSION")
        );
        return Ok(());
    };

    match command {
        Commands::Run(args) => run::execute(*args).await,
        Commands::Validate(args) => validate::execute(&args).await,
        Commands::Health(args) => health::execute(args).await,
    }
}
