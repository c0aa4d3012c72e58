//! cmkit
//!
//! Command-line front end for the cmkit XML codec.

mod commands;
mod config;

use clap::Parser;
use tracing::debug;

use crate::config::CliConfig;

/// Installs the global subscriber. Logs go to stderr so they never mix with
/// command output.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cmkit={level},cmkit_codec={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level.to_ascii_lowercase());

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    debug!(
        log_level = %config.log_level,
        window_size = config.window_size,
        "Starting cmkit"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&config, &mut out)
}
