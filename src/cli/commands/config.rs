//! CLI command for `mapposter config`

use anyhow::{Context, Result};

use crate::cli::output;
use crate::core::settings::Settings;
use crate::infra::dirs::PosterDirs;

/// Print the effective settings as TOML
pub fn execute_show() -> Result<()> {
    let dirs = PosterDirs::new();
    let settings = Settings::load(&dirs)?;

    if output::print_json(&serde_json::to_value(&settings)?) {
        return Ok(());
    }

    let text = toml::to_string_pretty(&settings).context("Failed to format settings")?;
    println!("# {}", dirs.settings_path().display());
    print!("{text}");
    Ok(())
}

/// Print the settings file path
pub fn execute_path() -> Result<()> {
    let path = PosterDirs::new().settings_path();
    if !output::print_json(&serde_json::json!({ "path": path })) {
        println!("{}", path.display());
    }
    Ok(())
}
