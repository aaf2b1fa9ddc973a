//! Coordinate parsing
//!
//! Accepts decimal degrees (`-23.5`), degree/minute/second strings with
//! cardinal letters (`23°30'0"S`), `lat, lon` pairs and map-service links
//! carrying a coordinate pair.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// A WGS84 location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are in range
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"))
}

fn link_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"@(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)",
            r"[?&]q=(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)",
            r"[?&]query=(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)",
            r"[?&]ll=(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid link pattern"))
        .collect()
    })
}

/// Sign implied by a cardinal letter; southern and western win
fn direction_sign(value: &str) -> f64 {
    let upper = value.to_uppercase();
    for (letter, sign) in [('S', -1.0), ('W', -1.0), ('N', 1.0), ('E', 1.0)] {
        if upper.contains(letter) {
            return sign;
        }
    }
    1.0
}

/// Parse a single latitude or longitude into decimal degrees
///
/// Up to three numeric groups are read as degrees, minutes and seconds.
/// A negative number or an `S`/`W` letter makes the result negative.
pub fn parse_coordinate(value: &str) -> Result<f64, CoordinateError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoordinateError::Empty);
    }

    let numbers: Vec<f64> = number_regex()
        .find_iter(value)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    let Some(&degrees) = numbers.first() else {
        return Err(CoordinateError::NoNumbers {
            input: value.to_string(),
        });
    };

    let minutes = numbers.get(1).copied().unwrap_or(0.0).abs();
    let seconds = numbers.get(2).copied().unwrap_or(0.0).abs();
    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;

    let negative = numbers.iter().take(3).any(|n| *n < 0.0);
    let sign = if negative { -1.0 } else { direction_sign(value) };

    Ok(magnitude * sign)
}

/// Parse a `lat, lon` pair and range-check it
pub fn parse_lat_lon(value: &str) -> Result<GeoPoint, CoordinateError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(CoordinateError::InvalidPair {
            input: value.to_string(),
        });
    }

    let point = GeoPoint::new(parse_coordinate(parts[0])?, parse_coordinate(parts[1])?);
    if !point.is_valid() {
        return Err(CoordinateError::OutOfRange {
            lat: point.lat,
            lon: point.lon,
        });
    }

    Ok(point)
}

/// Extract a coordinate pair from a Google Maps style link
pub fn extract_google_maps_coordinates(url: &str) -> Option<GeoPoint> {
    link_patterns().iter().find_map(|re| {
        let caps = re.captures(url)?;
        let lat = caps.get(1)?.as_str().parse().ok()?;
        let lon = caps.get(2)?.as_str().parse().ok()?;
        Some(GeoPoint::new(lat, lon))
    })
}

/// Parse either a map link or a `lat, lon` pair
pub fn parse_location(value: &str) -> Result<GeoPoint, CoordinateError> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return Err(CoordinateError::Empty);
    }

    if cleaned.starts_with("http") {
        return extract_google_maps_coordinates(cleaned).ok_or_else(|| {
            CoordinateError::UnrecognizedLink {
                url: cleaned.to_string(),
            }
        });
    }

    parse_lat_lon(cleaned)
}
