//! Service URLs

/// Nominatim search endpoint used for geocoding
pub const NOMINATIM_SEARCH: &str = "https://nominatim.openstreetmap.org/search";

/// Overpass API interpreter endpoint
pub const OVERPASS_API: &str = "https://overpass-api.de/api/interpreter";

/// Preprocessed OSM water polygons (split, WGS84)
pub const WATER_POLYGONS: &str =
    "https://osmdata.openstreetmap.de/download/water-polygons-split-4326.zip";

/// Where to download the water polygons manually
pub const WATER_POLYGONS_INFO: &str = "https://osmdata.openstreetmap.de/data/water-polygons.html";
