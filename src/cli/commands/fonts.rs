//! CLI command for `mapposter fonts`

use anyhow::Result;

use crate::cli::output::{self, status};
use crate::core::fonts::list_families;
use crate::infra::dirs::PosterDirs;

/// Execute fonts command
pub fn execute() -> Result<()> {
    let dir = PosterDirs::new().fonts_dir();
    let families = list_families(&dir);

    if output::print_json(&serde_json::json!({
        "directory": dir,
        "families": families,
    })) {
        return Ok(());
    }

    if families.is_empty() {
        output::print_status(
            status::INFO,
            &format!("No local fonts in {}; system fonts are used", dir.display()),
        );
        return Ok(());
    }

    println!("Font families in {}:\n", dir.display());
    for family in &families {
        println!("  {family}");
    }
    Ok(())
}
