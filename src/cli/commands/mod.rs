//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod cache;
pub mod config;
pub mod effects;
pub mod fonts;
pub mod generate;
pub mod themes;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::core::effects::{DEFAULT_BAND_ANGLE, DEFAULT_FADE_RATIO, DEFAULT_GLOW_SIGMA, DEFAULT_GLOW_STRENGTH};

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a poster
    Generate(Box<generate::GenerateArgs>),

    /// List available themes
    Themes,

    /// List local font families
    Fonts,

    /// Manage the map data cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Show user settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Merge posters into diagonal bands
    Bands {
        /// PNG files, or one directory of PNG files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Band angle in degrees
        #[arg(long, default_value_t = DEFAULT_BAND_ANGLE, allow_hyphen_values = true)]
        angle: f64,

        /// Share of the band width used for blending
        #[arg(long, default_value_t = DEFAULT_FADE_RATIO)]
        fade: f64,

        /// Output file (default: output_bands.png next to the inputs)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a glow to posters
    Glow {
        /// PNG files, or one directory of PNG files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Blur radius in pixels
        #[arg(long, default_value_t = DEFAULT_GLOW_SIGMA)]
        sigma: f32,

        /// Glow intensity
        #[arg(long, default_value_t = DEFAULT_GLOW_STRENGTH)]
        strength: f32,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache information
    Info,

    /// Clear cache
    Clean,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Print the settings file path
    Path,
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Generate(args) => generate::execute(*args).await,
            Self::Themes => themes::execute(),
            Self::Fonts => fonts::execute(),
            Self::Cache { command } => match command {
                CacheCommands::Info => cache::execute_info(),
                CacheCommands::Clean => cache::execute_clean(),
            },
            Self::Config { command } => match command {
                ConfigCommands::Show => config::execute_show(),
                ConfigCommands::Path => config::execute_path(),
            },
            Self::Bands {
                inputs,
                angle,
                fade,
                output,
            } => effects::execute_bands(&inputs, angle, fade, output),
            Self::Glow {
                inputs,
                sigma,
                strength,
            } => effects::execute_glow(&inputs, sigma, strength),
        }
    }
}
