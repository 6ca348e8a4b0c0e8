//! SeatPool CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use seatpool_core::config::LoggingConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match commands::load_config(&cli.config, &cli.env) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(2);
        }
    };
    init_logging(&config.logging);

    if let Err(e) = cli.execute(&config).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Install the global subscriber. Logs go to stderr so command output
/// on stdout stays machine-readable.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
