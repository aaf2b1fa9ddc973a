//! Post-processing effects on rendered posters
//!
//! `merge_bands` splits the canvas into diagonal bands, one per input poster,
//! and cross-fades across each boundary. `add_glow` adds a blurred copy of
//! the color channels on top of the image.

use std::path::{Path, PathBuf};

use image::{imageops, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::RenderError;

/// Default band angle in degrees
pub const DEFAULT_BAND_ANGLE: f64 = -10.0;
/// Default share of the band width used for blending
pub const DEFAULT_FADE_RATIO: f64 = 0.5;
/// Default glow blur radius
pub const DEFAULT_GLOW_SIGMA: f32 = 25.0;
/// Default glow intensity
pub const DEFAULT_GLOW_STRENGTH: f32 = 0.7;

/// Open an image as RGBA
pub fn load_rgba(path: &Path) -> Result<RgbaImage, RenderError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| RenderError::Effect(format!("{}: {e}", path.display())))
}

/// Save an image as PNG, creating parent directories
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RenderError::Write {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| RenderError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
}

/// PNG files in `dir`, sorted by name, excluding `exclude`
pub fn png_inputs(dir: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, RenderError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RenderError::Effect(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .filter(|p| !exclude.is_some_and(|x| same_file(p, x)))
        .collect();
    paths.sort();
    Ok(paths)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Position of a pixel along the band axis
fn band_axis(x: f64, y: f64, cos: f64, sin: f64) -> f64 {
    x * cos - y * sin
}

/// Blend posters into diagonal bands
///
/// Band `i` shows image `i`. Each boundary cross-fades linearly over
/// `fade_ratio * band_width` on either side.
pub fn merge_bands(images: &[RgbaImage], angle_deg: f64, fade_ratio: f64) -> Result<RgbaImage, RenderError> {
    let first = images
        .first()
        .ok_or_else(|| RenderError::Effect("no images to merge".to_string()))?;
    let (w, h) = first.dimensions();
    if let Some(other) = images.iter().find(|img| img.dimensions() != (w, h)) {
        let (ow, oh) = other.dimensions();
        return Err(RenderError::Effect(format!(
            "image sizes differ: {w}x{h} and {ow}x{oh}"
        )));
    }
    if images.len() == 1 {
        return Ok(first.clone());
    }

    let n = images.len();
    let theta = (-angle_deg).to_radians();
    let (sin, cos) = theta.sin_cos();

    let (max_x, max_y) = (f64::from(w.saturating_sub(1)), f64::from(h.saturating_sub(1)));
    let corners = [(0.0, 0.0), (max_x, 0.0), (0.0, max_y), (max_x, max_y)];
    let axis: Vec<f64> = corners
        .iter()
        .map(|&(x, y)| band_axis(x, y, cos, sin))
        .collect();
    let min = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let max = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let band_width = (max - min) / n as f64;
    let fade = band_width * fade_ratio.max(0.0);

    tracing::debug!("Merging {n} images into bands of {band_width:.1} px");

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let pos = band_axis(f64::from(x), f64::from(y), cos, sin);
        let band = if band_width > 0.0 {
            (((pos - min) / band_width).floor().max(0.0) as usize).min(n - 1)
        } else {
            0
        };
        let mut pixel = *images[band].get_pixel(x, y);

        if fade > 0.0 {
            // Later boundaries win where fades overlap
            for i in 0..n - 1 {
                let boundary = min + (i + 1) as f64 * band_width;
                let (start, end) = (boundary - fade, boundary + fade);
                if pos >= start && pos <= end {
                    let t = ((pos - start) / (end - start)).clamp(0.0, 1.0);
                    pixel = lerp(images[i].get_pixel(x, y), images[i + 1].get_pixel(x, y), t);
                }
            }
        }
        pixel
    });

    Ok(out)
}

fn lerp(a: &Rgba<u8>, b: &Rgba<u8>, t: f64) -> Rgba<u8> {
    let mut out = [0u8; 4];
    for (o, (&ca, &cb)) in out.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
        *o = (f64::from(ca) * (1.0 - t) + f64::from(cb) * t) as u8;
    }
    Rgba(out)
}

/// Add a glow: color plus its Gaussian blur times `strength`
///
/// Alpha is left untouched.
pub fn add_glow(image: &RgbaImage, sigma: f32, strength: f32) -> RgbaImage {
    let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Rgb([r, g, b])
    });
    let blurred = if sigma > 0.0 { imageops::blur(&rgb, sigma) } else { rgb };

    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let glow = blurred.get_pixel(x, y).0;
        let add = |c: u8, halo: u8| (f32::from(c) + f32::from(halo) * strength).clamp(0.0, 255.0) as u8;
        Rgba([add(r, glow[0]), add(g, glow[1]), add(b, glow[2]), a])
    })
}

/// `<dir>/glow/<stem>_glow.<ext>` for an input path
pub fn glow_output_path(input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("poster");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("png");
    dir.join("glow").join(format!("{stem}_glow.{ext}"))
}
