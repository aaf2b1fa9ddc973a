//! Layer catalog
//!
//! Every named category of map geometry the poster can draw: where its data
//! comes from, how it is styled and in which stacking order it is painted.

use std::fmt;

use crate::error::ResolverError;

/// How a tag key is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// Any value (`building=*`)
    Any,
    /// One of the listed values
    Values(&'static [&'static str]),
}

/// OSM tag selector: the feature matches if any key matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagFilter(pub &'static [(&'static str, TagMatch)]);

impl TagFilter {
    /// Tag keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(k, _)| *k)
    }

    /// Whether a tag set matches this filter
    pub fn matches<'a>(&self, mut get: impl FnMut(&str) -> Option<&'a str>) -> bool {
        self.0.iter().any(|(key, rule)| match (get(key), rule) {
            (Some(_), TagMatch::Any) => true,
            (Some(value), TagMatch::Values(values)) => values.contains(&value),
            (None, _) => false,
        })
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(k, rule)| match rule {
                TagMatch::Any => format!("{k}=*"),
                TagMatch::Values(v) => format!("{k}={}", v.join("|")),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Where a layer's data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Routable street network
    StreetNetwork,
    /// Tagged OSM features
    Features(TagFilter),
    /// Preprocessed ocean polygons, masked by coastline presence
    Ocean,
}

/// Which geometries of the layer are drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryClass {
    /// Filled polygons
    Polygons,
    /// Stroked lines with a base width in points
    Lines { width: f64 },
}

/// Declaration of one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpec {
    /// Layer name used on the command line and in configs
    pub name: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Name used in feature cache keys
    pub cache_name: &'static str,
    /// Data source
    pub kind: LayerKind,
    /// Drawn geometry class
    pub class: GeometryClass,
    /// Paint order (higher is on top)
    pub z_order: f64,
    /// Key used for the optional `<style_key>_core` highlight
    pub style_key: &'static str,
    /// Theme color key
    pub color_key: &'static str,
    /// Theme key used when `color_key` is absent
    pub fallback_key: Option<&'static str>,
    /// Layers whose data must be fetched first
    pub depends_on: &'static [&'static str],
    /// Whether the layer is painted (fetch-only layers are not)
    pub render: bool,
    /// Convert lines with a `width` tag into filled polygons
    pub buffer_by_width: bool,
    /// Enabled when no explicit selection is given
    pub default_enabled: bool,
}

/// Name of the street network layer
pub const ROADS: &str = "roads";
/// Name of the coastline layer
pub const COASTLINE: &str = "coastline";
/// Name of the ocean layer
pub const OCEANS: &str = "oceans";

const fn polygons(
    name: &'static str,
    label: &'static str,
    cache_name: &'static str,
    tags: TagFilter,
    z_order: f64,
    color_key: &'static str,
    fallback_key: &'static str,
) -> LayerSpec {
    LayerSpec {
        name,
        label,
        cache_name,
        kind: LayerKind::Features(tags),
        class: GeometryClass::Polygons,
        z_order,
        style_key: color_key,
        fallback_key: Some(fallback_key),
        color_key,
        depends_on: &[],
        render: true,
        buffer_by_width: false,
        default_enabled: true,
    }
}

const fn lines(
    name: &'static str,
    label: &'static str,
    tags: TagFilter,
    width: f64,
    z_order: f64,
    style_key: &'static str,
) -> LayerSpec {
    LayerSpec {
        name,
        label,
        cache_name: name,
        kind: LayerKind::Features(tags),
        class: GeometryClass::Lines { width },
        z_order,
        style_key,
        color_key: style_key,
        fallback_key: Some("road_primary"),
        depends_on: &[],
        render: true,
        buffer_by_width: false,
        default_enabled: true,
    }
}

static CATALOG: [LayerSpec; 19] = [
    LayerSpec {
        name: ROADS,
        label: "Roads (hierarchy)",
        cache_name: "graph",
        kind: LayerKind::StreetNetwork,
        class: GeometryClass::Lines { width: 0.4 },
        z_order: 5.0,
        style_key: "road",
        color_key: "road_default",
        fallback_key: None,
        depends_on: &[],
        render: true,
        buffer_by_width: false,
        default_enabled: true,
    },
    LayerSpec {
        name: "water",
        label: "Water (lakes, sea)",
        cache_name: "water",
        kind: LayerKind::Features(TagFilter(&[
            ("natural", TagMatch::Values(&["water", "bay", "strait"])),
            ("waterway", TagMatch::Values(&["riverbank", "dock", "canal"])),
        ])),
        class: GeometryClass::Polygons,
        z_order: 2.0,
        style_key: "water",
        color_key: "water",
        fallback_key: None,
        depends_on: &[],
        render: true,
        buffer_by_width: false,
        default_enabled: true,
    },
    LayerSpec {
        name: "rivers",
        label: "Rivers",
        cache_name: "rivers",
        kind: LayerKind::Features(TagFilter(&[(
            "waterway",
            TagMatch::Values(&["river", "stream"]),
        )])),
        class: GeometryClass::Lines { width: 2.0 },
        z_order: 3.0,
        style_key: "river",
        color_key: "water",
        fallback_key: None,
        depends_on: &[],
        render: true,
        buffer_by_width: true,
        default_enabled: true,
    },
    LayerSpec {
        name: COASTLINE,
        label: "Coastline",
        cache_name: "coast",
        kind: LayerKind::Features(TagFilter(&[(
            "natural",
            TagMatch::Values(&["coastline"]),
        )])),
        class: GeometryClass::Lines { width: 0.0 },
        z_order: 0.0,
        style_key: "coastline",
        color_key: "water",
        fallback_key: None,
        depends_on: &[],
        render: false,
        buffer_by_width: false,
        default_enabled: false,
    },
    LayerSpec {
        name: OCEANS,
        label: "Oceans",
        cache_name: "ocean",
        kind: LayerKind::Ocean,
        class: GeometryClass::Polygons,
        z_order: 0.0,
        style_key: "ocean",
        color_key: "water",
        fallback_key: None,
        depends_on: &[COASTLINE],
        render: true,
        buffer_by_width: false,
        default_enabled: true,
    },
    polygons(
        "forests",
        "Forests",
        "forest",
        TagFilter(&[
            ("natural", TagMatch::Values(&["wood"])),
            ("landuse", TagMatch::Values(&["forest", "logging"])),
        ]),
        1.0,
        "forest",
        "parks",
    ),
    polygons(
        "green_spaces",
        "Green spaces",
        "grass",
        TagFilter(&[
            ("natural", TagMatch::Values(&["grassland"])),
            (
                "landuse",
                TagMatch::Values(&[
                    "grass",
                    "recreation_ground",
                    "religious",
                    "village_green",
                    "greenery",
                    "greenfield",
                    "meadow",
                    "vineyard",
                ]),
            ),
            ("leisure", TagMatch::Values(&["park", "garden"])),
        ]),
        1.0,
        "grass",
        "parks",
    ),
    polygons(
        "farmland",
        "Farmland",
        "farmland",
        TagFilter(&[
            ("landuse", TagMatch::Values(&["farmland"])),
            ("natural", TagMatch::Values(&["heath", "scrub"])),
        ]),
        1.0,
        "farmland",
        "parks",
    ),
    polygons(
        "wetlands",
        "Wetlands",
        "wetlands",
        TagFilter(&[
            ("natural", TagMatch::Values(&["wetland"])),
            ("landuse", TagMatch::Values(&["salt_pond"])),
        ]),
        1.0,
        "wetlands",
        "parks",
    ),
    polygons(
        "beaches",
        "Beaches",
        "beaches",
        TagFilter(&[("natural", TagMatch::Values(&["beach", "sand"]))]),
        1.0,
        "beach",
        "parks",
    ),
    polygons(
        "industrial",
        "Industrial",
        "industrial",
        TagFilter(&[(
            "landuse",
            TagMatch::Values(&["industrial", "commercial", "construction"]),
        )]),
        1.0,
        "industrial",
        "parks",
    ),
    polygons(
        "residential",
        "Residential",
        "residential",
        TagFilter(&[("landuse", TagMatch::Values(&["residential"]))]),
        1.0,
        "residential",
        "parks",
    ),
    polygons(
        "buildings",
        "Buildings",
        "buildings",
        TagFilter(&[("building", TagMatch::Any)]),
        4.0,
        "building",
        "road_default",
    ),
    polygons(
        "parking",
        "Parking",
        "parking",
        TagFilter(&[
            ("amenity", TagMatch::Values(&["parking"])),
            (
                "parking",
                TagMatch::Values(&["surface", "multi-storey", "underground"]),
            ),
        ]),
        3.5,
        "parking",
        "parks",
    ),
    polygons(
        "sports",
        "Sports",
        "sports",
        TagFilter(&[(
            "leisure",
            TagMatch::Values(&["stadium", "sports_centre", "pitch"]),
        )]),
        3.5,
        "sports",
        "parks",
    ),
    polygons(
        "aerodrome",
        "Aerodromes",
        "aerodrome",
        TagFilter(&[("aeroway", TagMatch::Values(&["aerodrome"]))]),
        3.0,
        "aerodrome",
        "parks",
    ),
    LayerSpec {
        buffer_by_width: true,
        ..lines(
            "runways",
            "Runways",
            TagFilter(&[("aeroway", TagMatch::Values(&["runway", "taxiway"]))]),
            1.4,
            6.1,
            "runway",
        )
    },
    lines(
        "railways",
        "Railways",
        TagFilter(&[(
            "railway",
            TagMatch::Values(&["rail", "narrow_gauge", "monorail", "light_rail"]),
        )]),
        1.0,
        6.2,
        "railway",
    ),
    lines(
        "subtram",
        "Subway / tram",
        TagFilter(&[(
            "railway",
            TagMatch::Values(&["subway", "funicular", "tram"]),
        )]),
        0.8,
        6.0,
        "subtram",
    ),
];

/// All known layers in declaration order
pub fn catalog() -> &'static [LayerSpec] {
    &CATALOG
}

/// Look up a layer by name
pub fn find(name: &str) -> Option<&'static LayerSpec> {
    CATALOG.iter().find(|l| l.name == name)
}

/// Look up a layer by name, failing with the list of valid names
pub fn require(name: &str) -> Result<&'static LayerSpec, ResolverError> {
    find(name).ok_or_else(|| ResolverError::UnknownLayer {
        name: name.to_string(),
        available: selectable_names(),
    })
}

/// Layers enabled when nothing is selected
pub fn default_enabled() -> Vec<&'static str> {
    CATALOG
        .iter()
        .filter(|l| l.default_enabled)
        .map(|l| l.name)
        .collect()
}

/// Names a user can select (fetch-only layers excluded)
pub fn selectable_names() -> Vec<String> {
    CATALOG
        .iter()
        .filter(|l| l.render)
        .map(|l| l.name.to_string())
        .collect()
}
