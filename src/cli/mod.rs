//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no poster logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

/// mapposter - Stylized map posters from OpenStreetMap data
///
/// Geocode a city, fetch its streets, water and land use, and render a
/// themed poster as PNG, SVG or PDF.
#[derive(Parser, Debug)]
#[command(name = "mapposter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run().await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mapposter", "themes", "-vv", "--json"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Themes)));
    }
}
