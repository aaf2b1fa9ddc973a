//! CLI commands for `mapposter bands` and `mapposter glow`

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::cli::output::{self, status};
use crate::core::effects::{add_glow, glow_output_path, load_rgba, merge_bands, png_inputs, save_png};

const BANDS_FILE: &str = "output_bands.png";

/// Expand a single directory argument into its PNG files
fn collect_inputs(inputs: &[PathBuf], exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
    let paths = match inputs {
        [dir] if dir.is_dir() => png_inputs(dir, exclude)?,
        _ => inputs.to_vec(),
    };
    if paths.is_empty() {
        bail!("No PNG files found");
    }
    Ok(paths)
}

/// Default bands output: next to the inputs
fn default_bands_output(inputs: &[PathBuf]) -> PathBuf {
    match inputs {
        [dir] if dir.is_dir() => dir.join(BANDS_FILE),
        _ => inputs
            .first()
            .and_then(|p| p.parent())
            .unwrap_or_else(|| Path::new("."))
            .join(BANDS_FILE),
    }
}

/// Execute bands command
pub fn execute_bands(inputs: &[PathBuf], angle: f64, fade: f64, output: Option<PathBuf>) -> Result<()> {
    let output_path = output.unwrap_or_else(|| default_bands_output(inputs));
    let paths = collect_inputs(inputs, Some(&output_path))?;

    let spinner = output::create_spinner(&format!("Merging {} posters...", paths.len()));
    let result = paths
        .iter()
        .map(|p| load_rgba(p))
        .collect::<Result<Vec<_>, _>>()
        .and_then(|images| merge_bands(&images, angle, fade))
        .and_then(|merged| save_png(&merged, &output_path));
    spinner.finish_and_clear();
    result?;

    if !output::print_json(&serde_json::json!({ "inputs": paths, "output": output_path })) {
        output::print_status(status::SUCCESS, &format!("Saved {}", output_path.display()));
    }
    Ok(())
}

/// Execute glow command
pub fn execute_glow(inputs: &[PathBuf], sigma: f32, strength: f32) -> Result<()> {
    let paths = collect_inputs(inputs, None)?;
    let mut written = Vec::with_capacity(paths.len());

    for path in &paths {
        let target = glow_output_path(path);
        let spinner = output::create_spinner(&format!("Adding glow to {}...", path.display()));
        let result = load_rgba(path).and_then(|image| save_png(&add_glow(&image, sigma, strength), &target));
        spinner.finish_and_clear();
        result?;

        output::print_status(status::SUCCESS, &format!("Saved {}", target.display()));
        written.push(target);
    }

    output::print_json(&serde_json::json!({ "outputs": written }));
    Ok(())
}
