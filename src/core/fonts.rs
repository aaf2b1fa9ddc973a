//! Local font discovery
//!
//! Fonts live as flat files in the fonts directory. A family is inferred
//! from the file name (`Roboto-Bold.ttf` -> `Roboto`), and each family maps
//! the three weights the poster uses to a file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Family used when none is requested
pub const DEFAULT_FONT_FAMILY: &str = "Roboto";

/// Generic fallback appended to every font stack
pub const GENERIC_FAMILY: &str = "sans-serif";

/// Recognized font file extensions
pub const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "woff", "woff2"];

/// File name suffixes that denote a weight or style
const WEIGHT_TOKENS: [&str; 12] = [
    "thin",
    "extralight",
    "light",
    "regular",
    "book",
    "medium",
    "semibold",
    "bold",
    "extrabold",
    "black",
    "italic",
    "oblique",
];

/// Weights used by the poster typography
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Light,
    Regular,
    Bold,
}

impl FontWeight {
    /// CSS numeric weight
    pub fn css_weight(self) -> u16 {
        match self {
            Self::Light => 300,
            Self::Regular => 400,
            Self::Bold => 700,
        }
    }
}

/// Files for the three weights of a family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontSet {
    pub light: PathBuf,
    pub regular: PathBuf,
    pub bold: PathBuf,
}

impl FontSet {
    pub fn path(&self, weight: FontWeight) -> &Path {
        match weight {
            FontWeight::Light => &self.light,
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

/// A face as referenced from SVG: family name plus numeric weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
}

impl FontFace {
    /// CSS `font-family` value with a generic fallback
    pub fn css_family(&self) -> String {
        if self.family == GENERIC_FAMILY {
            return GENERIC_FAMILY.to_string();
        }
        format!("'{}', {GENERIC_FAMILY}", self.family.replace('\'', ""))
    }
}

/// Faces for the three poster weights
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typeface {
    pub light: FontFace,
    pub regular: FontFace,
    pub bold: FontFace,
}

impl Typeface {
    /// Same family at the standard weights
    pub fn named(family: &str) -> Self {
        let face = |weight: FontWeight| FontFace {
            family: family.to_string(),
            weight: weight.css_weight(),
        };
        Self {
            light: face(FontWeight::Light),
            regular: face(FontWeight::Regular),
            bold: face(FontWeight::Bold),
        }
    }

    pub fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Light => &self.light,
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_ ]+").expect("valid separator pattern"))
}

/// Family name inferred from a font file name
pub fn infer_family(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts: Vec<&str> = separator_regex()
        .split(&stem)
        .filter(|p| !p.is_empty())
        .collect();
    if parts
        .last()
        .is_some_and(|last| WEIGHT_TOKENS.contains(&last.to_lowercase().as_str()))
    {
        parts.pop();
    }

    let family = parts.join(" ");
    if family.is_empty() {
        stem
    } else {
        family
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Font files in `dir` grouped by inferred family
pub fn collect_local_fonts(dir: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut families: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return families;
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_font_file(p))
        .collect();
    paths.sort();

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        families.entry(infer_family(&name)).or_default().push(path);
    }
    families
}

/// Family names in `dir`, sorted case-insensitively
pub fn list_families(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = collect_local_fonts(dir).into_keys().collect();
    names.sort_by_key(|n| n.to_lowercase());
    names
}

/// Assign files to weights
///
/// The first file naming a weight wins; files without `bold` or `light` in
/// their name count as regular. Missing weights fall back to regular.
pub fn build_weight_map(files: &[PathBuf]) -> Option<FontSet> {
    let mut light = None;
    let mut regular = None;
    let mut bold = None;

    for path in files {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let slot = if name.contains("bold") {
            &mut bold
        } else if name.contains("light") {
            &mut light
        } else {
            &mut regular
        };
        if slot.is_none() {
            *slot = Some(path.clone());
        }
    }

    let regular = regular
        .or_else(|| bold.clone())
        .or_else(|| light.clone())?;
    Some(FontSet {
        light: light.unwrap_or_else(|| regular.clone()),
        bold: bold.unwrap_or_else(|| regular.clone()),
        regular,
    })
}

/// Weight map for a local family, matched case-insensitively
pub fn find_font_set(dir: &Path, family: &str) -> Option<FontSet> {
    let wanted = family.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    collect_local_fonts(dir)
        .into_iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .and_then(|(_, files)| build_weight_map(&files))
}

/// Read the real family name and weight from a font file
fn read_face(path: &Path) -> Option<FontFace> {
    let mut db = usvg::fontdb::Database::new();
    if let Err(e) = db.load_font_file(path) {
        tracing::warn!("Failed to read font '{}': {e}", path.display());
        return None;
    }
    let face = db.faces().next()?;
    let (family, _) = face.families.first()?;
    Some(FontFace {
        family: family.clone(),
        weight: face.weight.0,
    })
}

/// Faces for the requested family
///
/// Local families are resolved to the names embedded in their files. Other
/// names are passed through and left to system font matching.
pub fn resolve_typeface(fonts_dir: &Path, requested: Option<&str>) -> Typeface {
    let family = requested.unwrap_or(DEFAULT_FONT_FAMILY);

    let Some(set) = find_font_set(fonts_dir, family) else {
        if requested.is_some() {
            tracing::warn!("Font family '{family}' not found locally, relying on system fonts");
        }
        return Typeface::named(family);
    };

    tracing::info!("Using local font family: {family}");
    let fallback = Typeface::named(family);
    let face = |weight: FontWeight| {
        read_face(set.path(weight)).unwrap_or_else(|| fallback.face(weight).clone())
    };
    Typeface {
        light: face(FontWeight::Light),
        regular: face(FontWeight::Regular),
        bold: face(FontWeight::Bold),
    }
}
