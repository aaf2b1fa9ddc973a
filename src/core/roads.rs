//! Road hierarchy
//!
//! Maps OSM `highway` values to draw order, theme color key and base width.
//! Minor roads are painted first so major roads stay on top.

/// Style of one road class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadStyle {
    /// Paint order, ascending
    pub order: u8,
    /// Theme key, falling back to `road_default`
    pub color_key: &'static str,
    /// Base stroke width in points
    pub width: f64,
}

/// Theme key every road color falls back to
pub const ROAD_DEFAULT: &str = "road_default";

/// Highway value used when a way has none
pub const UNCLASSIFIED: &str = "unclassified";

const fn style(order: u8, color_key: &'static str, width: f64) -> RoadStyle {
    RoadStyle {
        order,
        color_key,
        width,
    }
}

const TRACK: RoadStyle = style(0, "road_track", 0.1);
const SERVICE: RoadStyle = style(1, "road_service", 0.4);
const RESIDENTIAL: RoadStyle = style(2, "road_residential", 0.4);
const TERTIARY: RoadStyle = style(3, "road_tertiary", 0.6);
const SECONDARY: RoadStyle = style(4, "road_secondary", 0.8);
const PRIMARY: RoadStyle = style(5, "road_primary", 1.0);
const TRUNK: RoadStyle = style(6, "road_primary", 1.0);
const MOTORWAY: RoadStyle = style(7, "road_motorway", 1.2);
const UNKNOWN: RoadStyle = style(1, ROAD_DEFAULT, 0.4);

/// Style for a normalized highway value
pub fn road_style(highway: &str) -> RoadStyle {
    match highway {
        "path" | "track" | "pedestrian" | "footway" | "cycleway" => TRACK,
        "service" => SERVICE,
        "residential" | "living_street" | "unclassified" => RESIDENTIAL,
        "tertiary" | "tertiary_link" => TERTIARY,
        "secondary" | "secondary_link" => SECONDARY,
        "primary" | "primary_link" => PRIMARY,
        "trunk" | "trunk_link" => TRUNK,
        "motorway" | "motorway_link" => MOTORWAY,
        _ => UNKNOWN,
    }
}

/// Normalize a raw highway tag
///
/// Multi-valued tags (`primary;secondary`) use the first entry; missing or
/// empty values become `unclassified`.
pub fn normalize_highway(raw: Option<&str>) -> &str {
    raw.and_then(|h| h.split(';').next())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(UNCLASSIFIED)
}

/// A selectable road class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadTypeOption {
    /// Base highway value
    pub key: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Selected by default
    pub default_enabled: bool,
    /// Selecting the class also selects `<key>_link`
    pub include_link: bool,
}

/// Road classes offered for filtering
pub const ROAD_TYPE_OPTIONS: [RoadTypeOption; 8] = [
    RoadTypeOption { key: "path", label: "Paths / cycleways", default_enabled: false, include_link: false },
    RoadTypeOption { key: "service", label: "Service", default_enabled: false, include_link: false },
    RoadTypeOption { key: "residential", label: "Residential", default_enabled: true, include_link: false },
    RoadTypeOption { key: "tertiary", label: "Tertiary (+link)", default_enabled: true, include_link: true },
    RoadTypeOption { key: "secondary", label: "Secondary (+link)", default_enabled: true, include_link: true },
    RoadTypeOption { key: "primary", label: "Primary (+link)", default_enabled: true, include_link: true },
    RoadTypeOption { key: "trunk", label: "Trunk (+link)", default_enabled: true, include_link: true },
    RoadTypeOption { key: "motorway", label: "Motorway (+link)", default_enabled: true, include_link: true },
];

/// Road classes selected by default
pub fn default_road_types() -> Vec<String> {
    ROAD_TYPE_OPTIONS
        .iter()
        .filter(|o| o.default_enabled)
        .map(|o| o.key.to_string())
        .collect()
}

/// Expand selected classes with their `_link` variants
pub fn expand_road_types<S: AsRef<str>>(selected: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for key in selected {
        let key = key.as_ref();
        if !out.iter().any(|k| k == key) {
            out.push(key.to_string());
        }
        let include_link = ROAD_TYPE_OPTIONS
            .iter()
            .any(|o| o.key == key && o.include_link);
        if include_link {
            let link = format!("{key}_link");
            if !out.contains(&link) {
                out.push(link);
            }
        }
    }
    out
}

/// Collapse a stored selection back to base classes
///
/// A class counts as selected if it or its `_link` variant is listed.
pub fn collapse_road_types<S: AsRef<str>>(stored: &[S]) -> Vec<String> {
    ROAD_TYPE_OPTIONS
        .iter()
        .filter(|o| {
            stored.iter().any(|s| {
                let s = s.as_ref();
                s == o.key || (o.include_link && s.strip_suffix("_link") == Some(o.key))
            })
        })
        .map(|o| o.key.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_style_table() {
        assert_eq!(road_style("footway"), TRACK);
        assert_eq!(road_style("living_street").color_key, "road_residential");
        assert_eq!(road_style("trunk_link").order, 6);
        assert_eq!(road_style("trunk").color_key, "road_primary");
        assert!((road_style("motorway").width - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_highway_uses_default() {
        let s = road_style("bridleway");
        assert_eq!(s.order, 1);
        assert_eq!(s.color_key, ROAD_DEFAULT);
        assert!((s.width - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_orders_increase_with_importance() {
        let chain = ["path", "service", "residential", "tertiary", "secondary", "primary", "trunk", "motorway"];
        let orders: Vec<u8> = chain.iter().map(|h| road_style(h).order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_normalize_highway() {
        assert_eq!(normalize_highway(Some("primary")), "primary");
        assert_eq!(normalize_highway(Some("primary;secondary")), "primary");
        assert_eq!(normalize_highway(Some("")), UNCLASSIFIED);
        assert_eq!(normalize_highway(None), UNCLASSIFIED);
    }

    #[test]
    fn test_expand_road_types_adds_links() {
        let expanded = expand_road_types(&["residential", "primary"]);
        assert_eq!(expanded, vec!["residential", "primary", "primary_link"]);
    }

    #[test]
    fn test_default_road_types() {
        let defaults = default_road_types();
        assert_eq!(defaults.first().map(String::as_str), Some("residential"));
        assert!(!defaults.contains(&"path".to_string()));
        assert_eq!(expand_road_types(&defaults).len(), defaults.len() + 5);
    }

    #[test]
    fn test_collapse_road_types() {
        let collapsed = collapse_road_types(&["motorway_link", "service", "bogus"]);
        assert_eq!(collapsed, vec!["service", "motorway"]);
    }
}
