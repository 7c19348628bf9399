//! # Bay Conditions Application Entry Point
//!
//! This binary serves the conditions API (`serve`), prints a one-off report
//! for a harbor to the terminal (`report`), or writes a starter configuration
//! file (`write-config`).

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use bay_conditions_lib::{
    config::{Config, CONFIG_FILE},
    renderer::draw_ascii,
    server::{self, AppState},
};

/// Marine weather, tides and route ETAs for San Francisco Bay harbors
#[derive(Parser, Debug)]
#[command(name = "bay-conditions", version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE, env = "BAY_CONDITIONS_CONFIG")]
    config: PathBuf,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address, overriding the config file
        #[arg(short, long, env = "BAY_CONDITIONS_LISTEN")]
        listen: Option<String>,
    },
    /// Print current conditions for one harbor
    Report {
        /// Harbor slug or name, e.g. "sausalito"
        #[arg(long, default_value = "san-francisco")]
        harbor: String,
    },
    /// Write the default configuration to a file
    WriteConfig {
        #[arg(default_value = CONFIG_FILE)]
        path: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // stderr keeps the report on stdout clean
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    if let Command::WriteConfig { path } = &args.command {
        return Config::with_default_harbors().save_to_path(path);
    }

    let config = Config::load_from_path(&args.config);
    let state = Arc::new(AppState::from_config(&config).context("building application state")?);

    let rt = tokio::runtime::Runtime::new()?;

    match args.command {
        Command::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.server.listen_addr.clone());
            tracing::info!("Starting bay conditions server");
            rt.block_on(server::serve(state, &listen))
        }
        Command::Report { harbor } => {
            let conditions = rt
                .block_on(state.harbor_conditions(&harbor))
                .with_context(|| format!("fetching conditions for '{}'", harbor))?;
            draw_ascii(&conditions);
            Ok(())
        }
        Command::WriteConfig { .. } => Ok(()),
    }
}
