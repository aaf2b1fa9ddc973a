//! Platform-specific directory management
//!
//! Provides platform-specific paths for cache, config, and data directories.
//! Follows XDG Base Directory Specification on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `MAPPOSTER_CACHE_DIR` (or `CACHE_DIR`) - Override cache directory
//! - `MAPPOSTER_CONFIG_DIR` - Override config directory
//! - `MAPPOSTER_DATA_DIR` - Override data directory
//! - `MAPPOSTER_THEMES_DIR` - Override themes directory
//! - `MAPPOSTER_FONTS_DIR` - Override local fonts directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "MAPPOSTER_CACHE_DIR";
pub const ENV_LEGACY_CACHE_DIR: &str = "CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "MAPPOSTER_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "MAPPOSTER_DATA_DIR";
pub const ENV_THEMES_DIR: &str = "MAPPOSTER_THEMES_DIR";
pub const ENV_FONTS_DIR: &str = "MAPPOSTER_FONTS_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "mapposter";

/// Subdirectory names
const WATER_POLYGONS_SUBDIR: &str = "water_polygons";
const THEMES_SUBDIR: &str = "themes";
const FONTS_SUBDIR: &str = "fonts";

/// Platform-specific directory provider for mapposter
#[derive(Debug, Clone)]
pub struct PosterDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
    themes_dir: PathBuf,
    fonts_dir: PathBuf,
}

impl PosterDirs {
    /// Create a new `PosterDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        let data_dir = Self::resolve_data_dir();
        Self {
            cache_dir: Self::resolve_cache_dir(),
            config_dir: Self::resolve_config_dir(),
            themes_dir: Self::resolve_asset_dir(ENV_THEMES_DIR, THEMES_SUBDIR, &data_dir),
            fonts_dir: Self::resolve_asset_dir(ENV_FONTS_DIR, FONTS_SUBDIR, &data_dir),
            data_dir,
        }
    }

    /// Build directories rooted at explicit paths (used by tests and embedding)
    #[must_use]
    pub fn with_root(root: &std::path::Path) -> Self {
        Self {
            cache_dir: root.join("cache"),
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            themes_dir: root.join(THEMES_SUBDIR),
            fonts_dir: root.join(FONTS_SUBDIR),
        }
    }

    /// Get the cache directory path
    ///
    /// Holds the key/value cache of geocoding results and map data.
    /// - Linux: `$XDG_CACHE_HOME/mapposter` or `~/.cache/mapposter`
    /// - macOS: `~/Library/Caches/mapposter`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Get the config directory path
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the data directory path
    ///
    /// Used for large downloaded datasets.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Directory holding the extracted water polygons shapefile
    #[must_use]
    pub fn water_polygons_dir(&self) -> PathBuf {
        self.data_dir.join(WATER_POLYGONS_SUBDIR)
    }

    /// Directory holding `<theme>.json` files
    #[must_use]
    pub fn themes_dir(&self) -> PathBuf {
        self.themes_dir.clone()
    }

    /// Directory holding local font files
    #[must_use]
    pub fn fonts_dir(&self) -> PathBuf {
        self.fonts_dir.clone()
    }

    /// Get the global settings file path
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Replace the themes directory
    #[must_use]
    pub fn with_themes_dir(mut self, dir: PathBuf) -> Self {
        self.themes_dir = dir;
        self
    }

    /// Replace the fonts directory
    #[must_use]
    pub fn with_fonts_dir(mut self, dir: PathBuf) -> Self {
        self.fonts_dir = dir;
        self
    }

    /// Resolve cache directory from environment or platform default
    fn resolve_cache_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CACHE_DIR) {
            return PathBuf::from(path);
        }
        if let Ok(path) = env::var(ENV_LEGACY_CACHE_DIR) {
            return PathBuf::from(path);
        }

        Self::platform_cache_dir()
    }

    /// Resolve config directory from environment or platform default
    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        Self::platform_config_dir()
    }

    /// Resolve data directory from environment or platform default
    fn resolve_data_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_DATA_DIR) {
            return PathBuf::from(path);
        }

        Self::platform_data_dir()
    }

    /// Themes and fonts: env override, then `./<subdir>` if present, then data dir
    fn resolve_asset_dir(env_name: &str, subdir: &str, data_dir: &std::path::Path) -> PathBuf {
        if let Ok(path) = env::var(env_name) {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(subdir);
        if local.is_dir() {
            return local;
        }

        data_dir.join(subdir)
    }

    /// Get platform-specific cache directory
    fn platform_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".cache").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".cache").join(APP_NAME))
            })
    }

    /// Get platform-specific config directory
    fn platform_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }

    /// Get platform-specific data directory
    fn platform_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".local").join("share").join(APP_NAME))
                    .unwrap_or_else(|| {
                        PathBuf::from(".")
                            .join(".local")
                            .join("share")
                            .join(APP_NAME)
                    })
            })
    }
}

impl Default for PosterDirs {
    fn default() -> Self {
        Self::new()
    }
}
