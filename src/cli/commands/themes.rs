//! CLI command for `mapposter themes`

use anyhow::Result;

use crate::cli::output::{self, status};
use crate::core::theme::{available_themes, Theme};
use crate::infra::dirs::PosterDirs;

/// Execute themes command
pub fn execute() -> Result<()> {
    let dir = PosterDirs::new().themes_dir();
    let names = available_themes(&dir);

    let mut listed = Vec::with_capacity(names.len());
    for name in names {
        match Theme::load(&dir, &name) {
            Ok(theme) => listed.push((name, theme.name, theme.description)),
            Err(e) => tracing::warn!("Skipping theme '{name}': {e}"),
        }
    }

    let entries: Vec<_> = listed
        .iter()
        .map(|(id, name, description)| {
            serde_json::json!({ "id": id, "name": name, "description": description })
        })
        .collect();
    if output::print_json(&serde_json::json!({ "themes": entries })) {
        return Ok(());
    }

    if listed.is_empty() {
        output::print_status(
            status::WARNING,
            &format!("No themes found in {}", dir.display()),
        );
        return Ok(());
    }

    println!("Available themes:\n");
    for (id, name, description) in &listed {
        println!("  {id:<20} {name}");
        if !description.is_empty() {
            println!("  {:<20} {description}", "");
        }
    }
    Ok(())
}
