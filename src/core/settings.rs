//! User settings
//!
//! Reads `config.toml` from the config directory. Settings cover the
//! network endpoints and politeness delays, and the defaults applied to
//! `generate` when a flag is not given.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{defaults, urls};
use crate::error::ConfigError;
use crate::infra::dirs::PosterDirs;

/// User settings for mapposter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Network settings
    #[serde(default)]
    pub network: NetworkSettings,

    /// Defaults for poster generation
    #[serde(default)]
    pub defaults: PosterDefaults,
}

/// Network settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Custom Nominatim search URL
    pub nominatim_url: Option<String>,

    /// Custom Overpass interpreter URL
    pub overpass_url: Option<String>,

    /// Custom water polygons archive URL
    pub water_polygons_url: Option<String>,

    /// User agent for all requests
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Pause before geocoding requests in milliseconds
    pub geocode_delay_ms: Option<u64>,

    /// Pause after street network downloads in milliseconds
    pub graph_delay_ms: Option<u64>,

    /// Pause after feature downloads in milliseconds
    pub features_delay_ms: Option<u64>,
}

/// Defaults for `generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosterDefaults {
    pub theme: Option<String>,
    pub distance: Option<u32>,
    pub dpi: Option<u32>,
    pub format: Option<String>,
    pub posters_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config directory
    ///
    /// A missing file yields the defaults; an invalid one is an error.
    pub fn load(dirs: &PosterDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.settings_path())
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Save settings to the config directory
    pub fn save(&self, dirs: &PosterDirs) -> Result<(), ConfigError> {
        self.save_to_path(&dirs.settings_path())
    }

    /// Save settings to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    #[must_use]
    pub fn nominatim_url(&self) -> &str {
        self.network
            .nominatim_url
            .as_deref()
            .unwrap_or(urls::NOMINATIM_SEARCH)
    }

    #[must_use]
    pub fn overpass_url(&self) -> &str {
        self.network
            .overpass_url
            .as_deref()
            .unwrap_or(urls::OVERPASS_API)
    }

    #[must_use]
    pub fn water_polygons_url(&self) -> &str {
        self.network
            .water_polygons_url
            .as_deref()
            .unwrap_or(urls::WATER_POLYGONS)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.network
            .user_agent
            .as_deref()
            .unwrap_or(defaults::USER_AGENT)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.network
                .timeout_secs
                .unwrap_or(defaults::REQUEST_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn geocode_delay(&self) -> Duration {
        Duration::from_millis(
            self.network
                .geocode_delay_ms
                .unwrap_or(defaults::GEOCODE_DELAY_MS),
        )
    }

    #[must_use]
    pub fn graph_delay(&self) -> Duration {
        Duration::from_millis(
            self.network
                .graph_delay_ms
                .unwrap_or(defaults::GRAPH_DELAY_MS),
        )
    }

    #[must_use]
    pub fn features_delay(&self) -> Duration {
        Duration::from_millis(
            self.network
                .features_delay_ms
                .unwrap_or(defaults::FEATURES_DELAY_MS),
        )
    }

    #[must_use]
    pub fn default_theme(&self) -> &str {
        self.defaults
            .theme
            .as_deref()
            .unwrap_or(defaults::DEFAULT_THEME)
    }

    #[must_use]
    pub fn default_distance(&self) -> u32 {
        self.defaults.distance.unwrap_or(defaults::DEFAULT_DISTANCE)
    }

    #[must_use]
    pub fn default_dpi(&self) -> u32 {
        self.defaults.dpi.unwrap_or(defaults::DEFAULT_DPI)
    }

    #[must_use]
    pub fn default_format(&self) -> &str {
        self.defaults
            .format
            .as_deref()
            .unwrap_or(defaults::DEFAULT_FORMAT)
    }

    #[must_use]
    pub fn posters_dir(&self) -> PathBuf {
        self.defaults
            .posters_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_POSTERS_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.overpass_url(), urls::OVERPASS_API);
        assert_eq!(settings.default_theme(), defaults::DEFAULT_THEME);
        assert_eq!(settings.default_distance(), defaults::DEFAULT_DISTANCE);
        assert_eq!(settings.geocode_delay(), Duration::from_secs(1));
        assert_eq!(settings.posters_dir(), PathBuf::from("posters"));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(&temp_dir.path().join("config.toml")).unwrap();
        assert!(settings.network.overpass_url.is_none());
    }

    #[test]
    fn test_load_valid_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let content = r#"
[network]
overpass_url = "https://overpass.example.com/api/interpreter"
features_delay_ms = 0

[defaults]
theme = "noir"
distance = 12000
"#;
        fs::write(&path, content).unwrap();

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(
            settings.overpass_url(),
            "https://overpass.example.com/api/interpreter"
        );
        assert_eq!(settings.features_delay(), Duration::ZERO);
        assert_eq!(settings.default_theme(), "noir");
        assert_eq!(settings.default_distance(), 12_000);
        assert_eq!(settings.default_dpi(), defaults::DEFAULT_DPI);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        assert!(matches!(
            Settings::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let settings = Settings {
            network: NetworkSettings {
                user_agent: Some("poster-test/1.0".to_string()),
                timeout_secs: Some(30),
                ..NetworkSettings::default()
            },
            defaults: PosterDefaults {
                format: Some("svg".to_string()),
                posters_dir: Some(PathBuf::from("/tmp/posters")),
                ..PosterDefaults::default()
            },
        };

        settings.save_to_path(&path).unwrap();
        let loaded = Settings::load_from_path(&path).unwrap();

        assert_eq!(loaded.user_agent(), "poster-test/1.0");
        assert_eq!(loaded.timeout(), Duration::from_secs(30));
        assert_eq!(loaded.default_format(), "svg");
        assert_eq!(loaded.posters_dir(), PathBuf::from("/tmp/posters"));
    }

    #[test]
    fn test_load_from_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = PosterDirs::with_root(temp_dir.path());
        Settings::default().save(&dirs).unwrap();
        assert!(dirs.settings_path().exists());
        assert!(Settings::load(&dirs).is_ok());
    }
}
