//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status lines, and error messages to the user.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// How much the CLI prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Errors only
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self { quiet, json, verbose }
    }

    /// Make this configuration visible to every command
    pub fn apply_global(self) {
        // A second call keeps the first configuration
        let _ = OUTPUT.set(self);
    }

    /// The global configuration, or the default before `apply_global`
    pub fn current() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Whether human-readable status lines are printed
    pub fn show_status(self) -> bool {
        !self.quiet && !self.json
    }

    /// Tracing level implied by `-v`
    pub fn log_level(self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// Print a status line unless output is quiet or JSON
pub fn print_status(prefix: &str, message: &str) {
    if OutputConfig::current().show_status() {
        println!("{prefix} {message}");
    }
}

/// Print a JSON value when JSON output is enabled
///
/// Returns whether it was printed.
pub fn print_json(value: &serde_json::Value) -> bool {
    if !OutputConfig::current().json {
        return false;
    }
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!("Failed to serialize output: {e}"),
    }
    true
}

/// Report an error with its causes on stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::current().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let value = serde_json::json!({ "error": error.to_string(), "causes": causes });
        eprintln!("{value}");
        return;
    }

    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

fn hidden_unless_status(pb: ProgressBar) -> ProgressBar {
    if OutputConfig::current().show_status() {
        pb
    } else {
        ProgressBar::hidden()
    }
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = hidden_unless_status(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Create a progress bar for map layers
pub fn create_layer_bar(total: u64) -> ProgressBar {
    let pb = hidden_unless_status(ProgressBar::new(total));
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg:30} {percent:>3}% [{bar:30.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("█▓▒░"));
    }
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
