//! Theme loading
//!
//! A theme is a JSON file `<themes_dir>/<name>.json` mapping semantic keys
//! (`bg`, `water`, `road_primary`, ...) to hex colors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// Keys every theme must define
pub const REQUIRED_KEYS: [&str; 6] = ["bg", "text", "gradient_color", "water", "parks", "road_default"];

/// Color used if neither a key nor its fallback is defined
const LAST_RESORT_COLOR: &str = "#000000";

/// Theme file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Display name
    #[serde(default)]
    pub name: String,

    /// One-line description
    #[serde(default)]
    pub description: String,

    /// Semantic key -> hex color
    #[serde(flatten)]
    pub colors: BTreeMap<String, serde_json::Value>,
}

/// A parsed `#rrggbb[aa]` color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        let bytes = hex.as_bytes();

        fn hex2(b: &[u8]) -> Option<u8> {
            let hi = (*b.first()? as char).to_digit(16)? as u8;
            let lo = (*b.get(1)? as char).to_digit(16)? as u8;
            Some((hi << 4) | lo)
        }
        fn hex1(c: u8) -> Option<u8> {
            let v = (c as char).to_digit(16)? as u8;
            Some((v << 4) | v)
        }

        let (r, g, b, a) = match bytes.len() {
            3 => (hex1(bytes[0])?, hex1(bytes[1])?, hex1(bytes[2])?, 255),
            4 => (hex1(bytes[0])?, hex1(bytes[1])?, hex1(bytes[2])?, hex1(bytes[3])?),
            6 => (hex2(&bytes[0..2])?, hex2(&bytes[2..4])?, hex2(&bytes[4..6])?, 255),
            8 => (
                hex2(&bytes[0..2])?,
                hex2(&bytes[2..4])?,
                hex2(&bytes[4..6])?,
                hex2(&bytes[6..8])?,
            ),
            _ => return None,
        };
        Some(Self { r, g, b, a })
    }

    /// `#rrggbb` without alpha
    pub fn to_rgb_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha as a fraction
    pub fn opacity(self) -> f64 {
        f64::from(self.a) / 255.0
    }
}

impl Theme {
    /// Load and validate `<dir>/<name>.json`
    pub fn load(dir: &Path, name: &str) -> Result<Self, ThemeError> {
        let path = theme_path(dir, name);
        if !path.is_file() {
            return Err(ThemeError::NotFound {
                name: name.to_string(),
                available: available_themes(dir),
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| ThemeError::Invalid {
            name: name.to_string(),
            error: e.to_string(),
        })?;

        let mut theme: Theme = serde_json::from_str(&content).map_err(|e| ThemeError::Invalid {
            name: name.to_string(),
            error: e.to_string(),
        })?;

        if theme.name.is_empty() {
            theme.name = name.to_string();
        }
        theme.validate(name)?;

        tracing::debug!("Loaded theme '{name}' from {}", path.display());
        Ok(theme)
    }

    /// Check required keys and color syntax
    fn validate(&self, file_name: &str) -> Result<(), ThemeError> {
        for key in REQUIRED_KEYS {
            if self.color(key).is_none() {
                return Err(ThemeError::MissingColor {
                    name: file_name.to_string(),
                    key: key.to_string(),
                });
            }
        }

        for (key, value) in &self.colors {
            if let Some(text) = value.as_str() {
                if HexColor::parse(text).is_none() {
                    return Err(ThemeError::InvalidColor {
                        name: file_name.to_string(),
                        key: key.clone(),
                        value: text.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Color for `key`, if defined
    pub fn color(&self, key: &str) -> Option<&str> {
        self.colors.get(key).and_then(serde_json::Value::as_str)
    }

    /// Color for `key`, else for `fallback`
    pub fn color_or<'a>(&'a self, key: &str, fallback: &str) -> &'a str {
        self.color(key)
            .or_else(|| self.color(fallback))
            .unwrap_or(LAST_RESORT_COLOR)
    }

    /// Whether an optional key is defined
    pub fn has(&self, key: &str) -> bool {
        self.color(key).is_some()
    }
}

/// Path of a theme file
pub fn theme_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

/// Sorted names of all themes in `dir`
pub fn available_themes(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Themes to render: all of them, or the one requested
pub fn select_themes(dir: &Path, requested: &str, all: bool) -> Result<Vec<String>, ThemeError> {
    let available = available_themes(dir);
    if available.is_empty() {
        return Err(ThemeError::NoThemes {
            path: dir.to_path_buf(),
        });
    }

    if all {
        return Ok(available);
    }

    if !available.iter().any(|n| n == requested) {
        return Err(ThemeError::NotFound {
            name: requested.to_string(),
            available,
        });
    }

    Ok(vec![requested.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = r##"{
        "name": "Test Noir",
        "description": "Black and white",
        "bg": "#000000",
        "text": "#FFFFFF",
        "gradient_color": "#000000",
        "water": "#0A0A0A",
        "parks": "#111111",
        "road_default": "#3A3A3A",
        "road_primary": "#FFF"
    }"##;

    fn write_theme(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(format!("{name}.json")), content).unwrap();
    }

    #[test]
    fn test_load_valid_theme() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "noir", VALID);

        let theme = Theme::load(temp.path(), "noir").unwrap();
        assert_eq!(theme.name, "Test Noir");
        assert_eq!(theme.color("bg"), Some("#000000"));
        assert!(!theme.has("road_motorway"));
    }

    #[test]
    fn test_color_fallback() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "noir", VALID);
        let theme = Theme::load(temp.path(), "noir").unwrap();

        assert_eq!(theme.color_or("road_primary", "road_default"), "#FFF");
        assert_eq!(theme.color_or("road_motorway", "road_default"), "#3A3A3A");
        assert_eq!(theme.color_or("nope", "also_nope"), LAST_RESORT_COLOR);
    }

    #[test]
    fn test_missing_theme_lists_available() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "noir", VALID);

        match Theme::load(temp.path(), "sepia") {
            Err(ThemeError::NotFound { name, available }) => {
                assert_eq!(name, "sepia");
                assert_eq!(available, vec!["noir".to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_key() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "partial", r##"{"bg": "#000000"}"##);

        assert!(matches!(
            Theme::load(temp.path(), "partial"),
            Err(ThemeError::MissingColor { .. })
        ));
    }

    #[test]
    fn test_invalid_color_value() {
        let temp = TempDir::new().unwrap();
        let broken = VALID.replace("\"#0A0A0A\"", "\"blue-ish\"");
        write_theme(temp.path(), "broken", &broken);

        match Theme::load(temp.path(), "broken") {
            Err(ThemeError::InvalidColor { key, .. }) => assert_eq!(key, "water"),
            other => panic!("expected InvalidColor, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "bad", "{ not json");
        assert!(matches!(
            Theme::load(temp.path(), "bad"),
            Err(ThemeError::Invalid { .. })
        ));
    }

    #[test]
    fn test_name_defaults_to_file_stem() {
        let temp = TempDir::new().unwrap();
        let unnamed = VALID.replace("\"name\": \"Test Noir\",", "");
        write_theme(temp.path(), "plain", &unnamed);
        assert_eq!(Theme::load(temp.path(), "plain").unwrap().name, "plain");
    }

    #[test]
    fn test_available_themes_sorted() {
        let temp = TempDir::new().unwrap();
        write_theme(temp.path(), "zen", VALID);
        write_theme(temp.path(), "autumn", VALID);
        fs::write(temp.path().join("README.md"), "x").unwrap();

        assert_eq!(available_themes(temp.path()), vec!["autumn", "zen"]);
        assert!(available_themes(&temp.path().join("missing")).is_empty());
    }

    #[test]
    fn test_select_themes() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            select_themes(temp.path(), "noir", false),
            Err(ThemeError::NoThemes { .. })
        ));

        write_theme(temp.path(), "noir", VALID);
        write_theme(temp.path(), "ocean", VALID);
        assert_eq!(select_themes(temp.path(), "noir", false).unwrap(), vec!["noir"]);
        assert_eq!(select_themes(temp.path(), "x", true).unwrap().len(), 2);
        assert!(select_themes(temp.path(), "x", false).is_err());
    }

    #[test]
    fn test_hex_color_parse() {
        assert_eq!(
            HexColor::parse("#FF8000"),
            Some(HexColor { r: 255, g: 128, b: 0, a: 255 })
        );
        assert_eq!(HexColor::parse("#fff").unwrap().to_rgb_hex(), "#ffffff");
        let translucent = HexColor::parse("#00000080").unwrap();
        assert!((translucent.opacity() - 128.0 / 255.0).abs() < 1e-9);
        assert!(HexColor::parse("red").is_none());
        assert!(HexColor::parse("#12345").is_none());
    }
}
