//! mapposter - stylized map posters from OpenStreetMap data
//!
//! Entry point for the mapposter command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mapposter::cli::output::{display_error, OutputConfig};
use mapposter::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(output_config.log_level().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
