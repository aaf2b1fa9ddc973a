//! Poster output
//!
//! The renderer produces SVG; PNG output is rasterized with resvg and PDF
//! output is converted with svg2pdf. Both load system fonts plus the local
//! fonts directory.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, RenderError};

/// SVG user units per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Largest raster side we try to allocate
const MAX_RASTER_SIDE_PX: u32 = 32_000;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            other => Err(ConfigError::InvalidValue {
                field: "format".to_string(),
                message: format!("'{other}' is not one of png, svg, pdf"),
            }),
        }
    }
}

/// Font sources for rasterization and PDF conversion
#[derive(Debug, Clone, Default)]
pub struct FontSources<'a> {
    /// Local fonts directory, loaded in addition to system fonts
    pub fonts_dir: Option<&'a Path>,
    /// Family used for text without a matching font
    pub fallback_family: Option<&'a str>,
}

fn raster_options(fonts: &FontSources<'_>) -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(dir) = fonts.fonts_dir.filter(|d| d.is_dir()) {
        opt.fontdb_mut().load_fonts_dir(dir);
    }
    if let Some(family) = fonts.fallback_family {
        opt.font_family = family.to_string();
    }
    opt
}

fn pdf_options(fonts: &FontSources<'_>) -> svg2pdf::usvg::Options<'static> {
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(dir) = fonts.fonts_dir.filter(|d| d.is_dir()) {
        opt.fontdb_mut().load_fonts_dir(dir);
    }
    if let Some(family) = fonts.fallback_family {
        opt.font_family = family.to_string();
    }
    opt
}

/// Rasterize an SVG at `scale` pixels per user unit
pub fn svg_to_pixmap(
    svg: &str,
    scale: f32,
    fonts: &FontSources<'_>,
) -> Result<tiny_skia::Pixmap, RenderError> {
    let opt = raster_options(fonts);
    let tree = usvg::Tree::from_str(svg, &opt).map_err(|e| RenderError::Svg(e.to_string()))?;

    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    if width > MAX_RASTER_SIDE_PX || height > MAX_RASTER_SIDE_PX {
        return Err(RenderError::Pixmap { width, height });
    }

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Rasterize an SVG to PNG bytes at the given DPI
pub fn svg_to_png(svg: &str, dpi: u32, fonts: &FontSources<'_>) -> Result<Vec<u8>, RenderError> {
    let scale = (f64::from(dpi) / POINTS_PER_INCH) as f32;
    let pixmap = svg_to_pixmap(svg, scale, fonts)?;
    pixmap.encode_png().map_err(|e| RenderError::Encode {
        format: "png".to_string(),
        error: e.to_string(),
    })
}

/// Convert an SVG to PDF bytes
pub fn svg_to_pdf(svg: &str, fonts: &FontSources<'_>) -> Result<Vec<u8>, RenderError> {
    let opt = pdf_options(fonts);
    let tree =
        svg2pdf::usvg::Tree::from_str(svg, &opt).map_err(|e| RenderError::Svg(e.to_string()))?;

    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| RenderError::Encode {
        format: "pdf".to_string(),
        error: e.to_string(),
    })
}

/// Encode `svg` in `format` and write it to `path`
///
/// Parent directories are created as needed.
pub fn write_output(
    svg: &str,
    format: OutputFormat,
    dpi: u32,
    path: &Path,
    fonts: &FontSources<'_>,
) -> Result<(), RenderError> {
    let bytes = match format {
        OutputFormat::Svg => svg.as_bytes().to_vec(),
        OutputFormat::Png => svg_to_png(svg, dpi, fonts)?,
        OutputFormat::Pdf => svg_to_pdf(svg, fonts)?,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RenderError::Write {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }

    fs::write(path, &bytes).map_err(|e| RenderError::Write {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
