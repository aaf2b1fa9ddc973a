//! CLI command for `mapposter cache`
//!
//! Shows and clears cached geocoding results and map data.

use anyhow::Result;

use crate::cli::output::{self, status};
use crate::infra::cache::{format_size, FileCache};
use crate::infra::dirs::PosterDirs;

/// Execute cache info subcommand
pub fn execute_info() -> Result<()> {
    let info = FileCache::from_dirs(&PosterDirs::new()).info();

    if output::print_json(&serde_json::json!({
        "path": info.path,
        "size_bytes": info.size_bytes,
        "items": info.item_count,
        "exists": info.exists,
    })) {
        return Ok(());
    }

    println!("Location: {}", info.path.display());
    println!("Size: {}", info.format_size());
    println!("Items: {}", info.item_count);

    if !info.exists {
        output::print_status(status::WARNING, "Cache directory does not exist (empty cache)");
    }
    Ok(())
}

/// Execute cache clean subcommand
pub fn execute_clean() -> Result<()> {
    let cache = FileCache::from_dirs(&PosterDirs::new());
    let freed = cache.clean()?;

    if output::print_json(&serde_json::json!({ "freed_bytes": freed })) {
        return Ok(());
    }

    if freed > 0 {
        output::print_status(
            status::SUCCESS,
            &format!("Cache cleared ({} freed)", format_size(freed)),
        );
    } else {
        output::print_status(status::SUCCESS, "Cache was already empty");
    }
    Ok(())
}
