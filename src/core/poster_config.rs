//! Saved poster configurations
//!
//! A poster configuration is a JSON document (`version: 1`) holding every
//! option of a poster. Numeric fields are accepted as numbers or as numeric
//! strings; empty strings count as unset.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::coordinates::{parse_location, GeoPoint};
use crate::core::export::OutputFormat;
use crate::core::layers;
use crate::core::roads;
use crate::core::typography::TextOptions;
use crate::error::ConfigError;

/// Current configuration format version
pub const CONFIG_VERSION: u32 = 1;

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Default poster width in millimetres
pub const DEFAULT_WIDTH_MM: f64 = 304.8;

/// Default poster height in millimetres
pub const DEFAULT_HEIGHT_MM: f64 = 406.4;

/// Default gradient size in percent of the poster side
pub const DEFAULT_GRADIENT_PERCENT: f64 = 25.0;

/// Default marker diameter in points
pub const DEFAULT_POI_SIZE: f64 = 12.0;

/// Default marker color
pub const DEFAULT_POI_COLOR: &str = "#e53935";

/// City label used when only coordinates are given
pub const COORDINATES_LABEL: &str = "Coordinates";

/// Deserializers accepting numbers written as strings
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    /// `12`, `"12"`, `"12,5"` -> `Some`; `""` or `null` -> `None`
    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<NumberOrText>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrText::Number(n)) => Ok(Some(n)),
            Some(NumberOrText::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                text.replace(',', ".")
                    .parse()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("'{text}' is not a number")))
            }
        }
    }
}

/// Sides covered by the fade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GradientOrientation {
    /// Top and bottom
    #[default]
    Vertical,
    /// Left and right
    Horizontal,
    /// All four sides
    Both,
}

impl From<String> for GradientOrientation {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "horizontal" => Self::Horizontal,
            "both" => Self::Both,
            _ => Self::Vertical,
        }
    }
}

impl From<GradientOrientation> for String {
    fn from(value: GradientOrientation) -> Self {
        match value {
            GradientOrientation::Vertical => "vertical",
            GradientOrientation::Horizontal => "horizontal",
            GradientOrientation::Both => "both",
        }
        .to_string()
    }
}

/// Edge fade settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub orientation: GradientOrientation,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            percent: None,
            orientation: GradientOrientation::Vertical,
        }
    }
}

impl GradientSettings {
    /// Fade size as a fraction of the poster side, capped at one half
    pub fn fraction(&self) -> f64 {
        (self.percent.unwrap_or(DEFAULT_GRADIENT_PERCENT) / 100.0).clamp(0.0, 0.5)
    }
}

/// Point-of-interest marker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoiSettings {
    pub enabled: bool,
    /// Google Maps link or `lat, lon`
    pub location: String,
    /// Optional SVG used instead of the default dot
    pub svg_path: String,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    pub color: String,
}

impl Default for PoiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            location: String::new(),
            svg_path: String::new(),
            size: None,
            color: DEFAULT_POI_COLOR.to_string(),
        }
    }
}

/// A resolved marker
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub point: GeoPoint,
    /// Diameter in points
    pub size: f64,
    pub color: String,
    pub svg_path: Option<PathBuf>,
}

impl PoiSettings {
    /// Resolve the marker, or `None` when disabled
    pub fn marker(&self) -> Result<Option<Marker>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }

        let point = parse_location(&self.location).map_err(|e| ConfigError::InvalidValue {
            field: "poi.location".to_string(),
            message: e.to_string(),
        })?;

        let size = self.size.unwrap_or(DEFAULT_POI_SIZE);
        if size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "poi.size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let color = Some(self.color.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_POI_COLOR)
            .to_string();
        let svg_path = Some(self.svg_path.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(Some(Marker {
            point,
            size,
            color,
            svg_path,
        }))
    }
}

/// Where the poster is centred
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    /// Geocode `city, country`
    Named { city: String, country: String },
    /// Explicit coordinates
    Coordinates(GeoPoint),
}

/// A saved poster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    pub version: u32,
    pub city: String,
    pub country: String,
    /// Google Maps link or `lat, lon`; takes precedence over geocoding
    pub coords: String,
    /// Text shown instead of the city name
    pub name_label: String,
    /// Text shown instead of the country name
    pub country_label: String,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub dpi: Option<f64>,
    pub theme: String,
    pub format: String,
    pub all_themes: bool,
    pub refresh_cache: bool,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    pub gradient: GradientSettings,
    pub poi: PoiSettings,
    pub text_options: TextOptions,
    /// Layers to draw; unset means every default layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_layers: Option<Vec<String>>,
    /// Road classes to draw; unset means the default classes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_types: Option<Vec<String>>,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            city: String::new(),
            country: String::new(),
            coords: String::new(),
            name_label: String::new(),
            country_label: String::new(),
            distance: None,
            width_mm: None,
            height_mm: None,
            dpi: None,
            theme: String::new(),
            format: String::new(),
            all_themes: false,
            refresh_cache: false,
            rotation: None,
            gradient: GradientSettings::default(),
            poi: PoiSettings::default(),
            text_options: TextOptions::default(),
            enabled_layers: None,
            road_types: None,
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

impl PosterConfig {
    /// Load and check a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        if config.version != CONFIG_VERSION {
            return Err(ConfigError::Version {
                version: config.version,
                expected: CONFIG_VERSION,
            });
        }

        tracing::info!("Loaded poster configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Where to centre the poster
    pub fn place(&self) -> Result<PlaceQuery, ConfigError> {
        if let Some(coords) = non_empty(&self.coords) {
            let point = parse_location(coords).map_err(|e| ConfigError::InvalidValue {
                field: "coords".to_string(),
                message: e.to_string(),
            })?;
            return Ok(PlaceQuery::Coordinates(point));
        }

        match (non_empty(&self.city), non_empty(&self.country)) {
            (Some(city), Some(country)) => Ok(PlaceQuery::Named {
                city: city.to_string(),
                country: country.to_string(),
            }),
            _ => Err(ConfigError::InvalidValue {
                field: "city".to_string(),
                message: "city and country are required unless coords are given".to_string(),
            }),
        }
    }

    /// City name used for the output folder and file name
    pub fn city_name(&self) -> String {
        non_empty(&self.city)
            .or_else(|| non_empty(&self.name_label))
            .unwrap_or(COORDINATES_LABEL)
            .to_string()
    }

    /// Text shown as the city name
    pub fn display_city(&self) -> String {
        non_empty(&self.name_label)
            .map_or_else(|| self.city_name(), ToString::to_string)
    }

    /// Text shown as the country name
    pub fn display_country(&self) -> String {
        non_empty(&self.country_label)
            .or_else(|| non_empty(&self.country))
            .unwrap_or_default()
            .to_string()
    }

    fn positive(value: Option<f64>, field: &str, default: f64) -> Result<f64, ConfigError> {
        let value = value.unwrap_or(default);
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("must be a positive number, got {value}"),
            })
        }
    }

    /// Map radius in metres
    pub fn distance_m(&self, default: u32) -> Result<f64, ConfigError> {
        Self::positive(self.distance, "distance", f64::from(default))
    }

    /// Poster width in inches
    pub fn width_in(&self) -> Result<f64, ConfigError> {
        Ok(Self::positive(self.width_mm, "width_mm", DEFAULT_WIDTH_MM)? / MM_PER_INCH)
    }

    /// Poster height in inches
    pub fn height_in(&self) -> Result<f64, ConfigError> {
        Ok(Self::positive(self.height_mm, "height_mm", DEFAULT_HEIGHT_MM)? / MM_PER_INCH)
    }

    /// Raster resolution
    pub fn dpi(&self, default: u32) -> Result<u32, ConfigError> {
        Ok(Self::positive(self.dpi, "dpi", f64::from(default))?.round() as u32)
    }

    /// Output format, falling back to `default` when unset
    pub fn output_format(&self, default: &str) -> Result<OutputFormat, ConfigError> {
        non_empty(&self.format).unwrap_or(default).parse()
    }

    /// Theme name, falling back to `default` when unset
    pub fn theme_name<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.theme).unwrap_or(default)
    }

    /// Rotation in degrees
    pub fn rotation_deg(&self) -> f64 {
        self.rotation.unwrap_or(0.0)
    }

    /// Layers to draw
    ///
    /// Unknown names are dropped with a warning so that configurations
    /// saved by newer versions still load.
    pub fn layers(&self) -> Vec<String> {
        let Some(enabled) = &self.enabled_layers else {
            return layers::default_enabled()
                .into_iter()
                .map(String::from)
                .collect();
        };
        enabled
            .iter()
            .filter(|name| {
                let known = layers::find(name).is_some_and(|l| l.render);
                if !known {
                    tracing::warn!("Ignoring unknown layer '{name}' in configuration");
                }
                known
            })
            .cloned()
            .collect()
    }

    /// Highway values to draw, with link variants
    pub fn highway_filter(&self) -> Vec<String> {
        let base = self
            .road_types
            .as_ref()
            .map_or_else(roads::default_road_types, |stored| {
                roads::collapse_road_types(stored)
            });
        roads::expand_road_types(&base)
    }
}

/// Width and height in millimetres for a size in inches
pub fn inches_to_mm(inches: f64) -> f64 {
    (inches * MM_PER_INCH * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GUI_SAVED: &str = r##"{
      "city": "Rio de Janeiro",
      "country": "Brazil",
      "coords": "",
      "name_label": "",
      "country_label": "",
      "distance": "29000",
      "width_mm": "305",
      "height_mm": "406",
      "dpi": "300",
      "theme": "noir",
      "format": "png",
      "all_themes": false,
      "refresh_cache": false,
      "gradient": {"enabled": true, "percent": "25", "orientation": "both"},
      "poi": {"enabled": true, "location": "-22.9519, -43.2105", "svg_path": "", "size": "12", "color": "#e53935"},
      "text_options": {"show_city": true, "main_size": "60", "city_pos": {"x": "0.5", "y": "0.14"}},
      "enabled_layers": ["roads", "water", "oceans"],
      "road_types": ["residential", "primary", "primary_link", "motorway_link"],
      "version": 1
    }"##;

    fn parse(json: &str) -> PosterConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_gui_saved_config() {
        let config = parse(GUI_SAVED);
        assert_eq!(config.distance, Some(29_000.0));
        assert_eq!(config.dpi(300).unwrap(), 300);
        assert!((config.width_in().unwrap() - 305.0 / 25.4).abs() < 1e-9);
        assert_eq!(config.gradient.orientation, GradientOrientation::Both);
        assert!((config.gradient.fraction() - 0.25).abs() < 1e-9);
        assert_eq!(config.output_format("svg").unwrap(), OutputFormat::Png);
        assert_eq!(config.theme_name("feature_based"), "noir");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse("{}");
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.distance_m(29_000).unwrap(), 29_000.0);
        assert!((config.height_in().unwrap() - 16.0).abs() < 1e-9);
        assert_eq!(config.layers(), layers::default_enabled());
        assert_eq!(config.highway_filter(), roads::expand_road_types(&roads::default_road_types()));
        assert!(config.gradient.enabled);
        assert!(config.poi.marker().unwrap().is_none());
        assert_eq!(config.theme_name("feature_based"), "feature_based");
    }

    #[test]
    fn test_invalid_number_is_parse_error() {
        let result: Result<PosterConfig, _> = serde_json::from_str(r#"{"distance": "far"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_positive_values_rejected() {
        let config = parse(r#"{"distance": 0, "dpi": "-5"}"#);
        assert!(config.distance_m(29_000).is_err());
        assert!(config.dpi(300).is_err());
    }

    #[test]
    fn test_place_prefers_coordinates() {
        let config = parse(r#"{"city": "Paris", "country": "France", "coords": "48.85, 2.35"}"#);
        assert_eq!(
            config.place().unwrap(),
            PlaceQuery::Coordinates(GeoPoint::new(48.85, 2.35))
        );

        let named = parse(r#"{"city": "Paris", "country": "France"}"#);
        assert!(matches!(named.place().unwrap(), PlaceQuery::Named { .. }));

        assert!(parse(r#"{"city": "Paris"}"#).place().is_err());
    }

    #[test]
    fn test_labels() {
        let coords_only = parse(r#"{"coords": "1, 2", "name_label": "Home"}"#);
        assert_eq!(coords_only.city_name(), "Home");
        assert_eq!(coords_only.display_city(), "Home");

        let bare = parse(r#"{"coords": "1, 2"}"#);
        assert_eq!(bare.city_name(), COORDINATES_LABEL);
        assert_eq!(bare.display_country(), "");

        let labelled = parse(r#"{"city": "New York", "country": "USA", "country_label": "United States"}"#);
        assert_eq!(labelled.display_city(), "New York");
        assert_eq!(labelled.display_country(), "United States");
    }

    #[test]
    fn test_layers_drop_unknown() {
        let config = parse(r#"{"enabled_layers": ["roads", "lava", "coastline"]}"#);
        assert_eq!(config.layers(), vec!["roads"]);
    }

    #[test]
    fn test_road_types_restore_links() {
        let config = parse(GUI_SAVED);
        assert_eq!(
            config.highway_filter(),
            vec!["residential", "primary", "primary_link", "motorway", "motorway_link"]
        );
    }

    #[test]
    fn test_marker_resolution() {
        let config = parse(GUI_SAVED);
        let marker = config.poi.marker().unwrap().unwrap();
        assert_eq!(marker.point, GeoPoint::new(-22.9519, -43.2105));
        assert!((marker.size - 12.0).abs() < 1e-9);
        assert!(marker.svg_path.is_none());

        let bad_size = PoiSettings {
            enabled: true,
            location: "1, 2".to_string(),
            size: Some(0.0),
            ..PoiSettings::default()
        };
        assert!(bad_size.marker().is_err());

        let bad_location = PoiSettings {
            enabled: true,
            location: "somewhere".to_string(),
            ..PoiSettings::default()
        };
        assert!(bad_location.marker().is_err());
    }

    #[test]
    fn test_unknown_orientation_is_vertical() {
        let gradient: GradientSettings =
            serde_json::from_str(r#"{"orientation": "Diagonal", "percent": 80}"#).unwrap();
        assert_eq!(gradient.orientation, GradientOrientation::Vertical);
        assert!((gradient.fraction() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("configs").join("rio.json");

        let config = parse(GUI_SAVED);
        config.save(&path).unwrap();
        let loaded = PosterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"orientation\": \"both\""));
    }

    #[test]
    fn test_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("future.json");
        fs::write(&path, r#"{"version": 2}"#).unwrap();
        assert!(matches!(
            PosterConfig::load(&path),
            Err(ConfigError::Version { version: 2, expected: 1 })
        ));
    }

    #[test]
    fn test_inches_to_mm() {
        assert!((inches_to_mm(12.0) - 304.8).abs() < 1e-9);
    }
}
