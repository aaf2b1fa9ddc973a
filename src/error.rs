//! Error types for mapposter
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Entry exists but could not be read or decoded
    #[error("Cache read failed for '{key}': {error}")]
    Read { key: String, error: String },

    /// Entry could not be written
    #[error("Cache write failed for '{key}': {error}")]
    Write { key: String, error: String },

    /// Cache directory could not be removed
    #[error("Failed to clean cache directory '{path}': {error}")]
    Clean { path: PathBuf, error: String },
}

/// Coordinate parsing errors
#[derive(Error, Debug, PartialEq)]
pub enum CoordinateError {
    /// Nothing to parse
    #[error("Coordinate value is required")]
    Empty,

    /// No digits in the input
    #[error("No numeric values found in coordinate '{input}'")]
    NoNumbers { input: String },

    /// Pair not in `lat, lon` form
    #[error("Expected coordinates in the form 'lat, lon', got '{input}'")]
    InvalidPair { input: String },

    /// Latitude or longitude outside the valid range
    #[error("Coordinates out of range: {lat}, {lon}")]
    OutOfRange { lat: f64, lon: f64 },

    /// URL without a recognizable coordinate pattern
    #[error("Could not extract coordinates from link '{url}'")]
    UnrecognizedLink { url: String },
}

/// Geocoding errors
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Request to the geocoding service failed
    #[error("Geocoding failed for '{query}': {error}")]
    Request { query: String, error: String },

    /// Service answered but found nothing
    #[error("Could not find coordinates for '{query}'")]
    NotFound { query: String },
}

/// Map data fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network error talking to the data service
    #[error("Request to '{url}' failed: {error}")]
    Network { url: String, error: String },

    /// Response could not be decoded
    #[error("Invalid response from '{url}': {error}")]
    InvalidResponse { url: String, error: String },

    /// Query matched no features
    #[error("No matching features for layer '{layer}'")]
    NoFeatures { layer: String },

    /// Street network is required but unavailable
    #[error("Failed to retrieve street network data")]
    MissingStreetNetwork,

    /// Water polygon dataset problem
    #[error("Water polygons unavailable at '{path}': {error}")]
    WaterPolygons { path: PathBuf, error: String },
}

/// Layer resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular layer dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Layer name not present in the catalog
    #[error("Unknown layer '{name}'. Available layers: {}", available.join(", "))]
    UnknownLayer {
        name: String,
        available: Vec<String>,
    },
}

/// Theme errors
#[derive(Error, Debug)]
pub enum ThemeError {
    /// Theme file not found
    #[error("Theme '{name}' not found. Available themes: {}", available.join(", "))]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    /// No themes in the themes directory
    #[error("No themes found in '{path}'")]
    NoThemes { path: PathBuf },

    /// Theme file could not be read or parsed
    #[error("Failed to load theme '{name}': {error}")]
    Invalid { name: String, error: String },

    /// Required color key missing
    #[error("Theme '{name}' is missing required color '{key}'")]
    MissingColor { name: String, key: String },

    /// Color value is not a hex color
    #[error("Theme '{name}' has invalid color '{value}' for '{key}'")]
    InvalidColor {
        name: String,
        key: String,
        value: String,
    },
}

/// Rendering and export errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// SVG could not be parsed for rasterization or PDF conversion
    #[error("Failed to parse generated SVG: {0}")]
    Svg(String),

    /// Pixmap allocation failed
    #[error("Failed to allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    /// Encoding the output failed
    #[error("Failed to encode {format}: {error}")]
    Encode { format: String, error: String },

    /// Output file could not be written
    #[error("Failed to write '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Marker SVG could not be read
    #[error("Failed to read marker '{path}': {error}")]
    Marker { path: PathBuf, error: String },

    /// Image effect failed
    #[error("Image effect failed: {0}")]
    Effect(String),
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Archive could not be extracted
    #[error("Failed to extract '{path}': {error}")]
    Archive { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded { url: String, retries: u32 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to write config file
    #[error("Failed to write config file '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Unsupported config version
    #[error("Unsupported poster config version {version} (expected {expected})")]
    Version { version: u32, expected: u32 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Top-level mapposter error type
#[derive(Error, Debug)]
pub enum PosterError {
    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Coordinate error
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] CoordinateError),

    /// Geocode error
    #[error("Geocode error: {0}")]
    Geocode(#[from] GeocodeError),

    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Theme error
    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    /// Render error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Download error
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Config error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}
