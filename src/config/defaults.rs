//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Default theme name
pub const DEFAULT_THEME: &str = "feature_based";

/// Default map radius in meters
pub const DEFAULT_DISTANCE: u32 = 29_000;

/// Default output resolution for raster formats
pub const DEFAULT_DPI: u32 = 300;

/// Default output format
pub const DEFAULT_FORMAT: &str = "png";

/// Default directory for generated posters
pub const DEFAULT_POSTERS_DIR: &str = "posters";

/// User agent sent to Nominatim and Overpass
pub const USER_AGENT: &str = concat!("mapposter/", env!("CARGO_PKG_VERSION"));

/// Pause before each geocoding request (Nominatim usage policy)
pub const GEOCODE_DELAY_MS: u64 = 1000;

/// Pause after each street network download
pub const GRAPH_DELAY_MS: u64 = 500;

/// Pause after each feature download
pub const FEATURES_DELAY_MS: u64 = 300;

/// HTTP timeout for data requests in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Reference poster width in inches used for line scaling
pub const REF_WIDTH_IN: f64 = 17.067;

/// Reference poster DPI used for line scaling
pub const REF_DPI: f64 = 300.0;

/// Reference field of view in meters (based on the compensated distance)
pub const REF_FOV_X: f64 = 53_334.375;

/// Reference pixels per meter: `REF_WIDTH_IN * REF_DPI / REF_FOV_X`
pub const REF_PX_PER_M: f64 = 0.096;

/// Poster size (smaller side, inches) at which base font sizes apply
pub const REF_FONT_SIDE_IN: f64 = 12.0;

/// Default gradient fade fraction of the poster height/width
pub const DEFAULT_FADE_FRACTION: f64 = 0.25;

/// Attribution text required by the OSM license
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";
