//! vigil - Session guard CLI
//!
//! Runs a timed, refreshable session that is torn down when it expires or
//! when the network becomes slow or unreachable.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr keeps stdout for command output)
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("vigil={}", level).parse()?)
                .add_directive(format!("vigil_core={}", level).parse()?),
        )
        .init();

    // Load configuration
    let config = config::Config::load()?;

    // Execute command
    match cli.command {
        Commands::Run { user, ephemeral } => {
            commands::run::execute(&user, ephemeral, &config).await
        }
        Commands::Probe { host, method, json } => {
            commands::probe::execute(host, method.map(Into::into), json, &config).await
        }
        Commands::Sessions(cmd) => commands::sessions::execute(cmd, &config),
        Commands::Config(cmd) => commands::config::execute(cmd, &config),
        Commands::Version => {
            println!("vigil {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
