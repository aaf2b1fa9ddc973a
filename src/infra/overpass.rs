//! OpenStreetMap data through the Overpass API
//!
//! Streets and tagged features are queried with Overpass QL (`out geom`, so
//! every way carries its coordinates). Ocean polygons come from the local
//! water polygon dataset.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect};
use serde::Deserialize;

use crate::config::{defaults, urls};
use crate::core::fetch::{Feature, MapDataSource, RoadEdge, StreetNetwork};
use crate::core::geometry::polygons_from_rings;
use crate::core::layers::{TagFilter, TagMatch};
use crate::error::FetchError;
use crate::infra::download::ProgressCallback;
use crate::infra::water::WaterPolygons;

/// `highway` values excluded from the street network
pub const EXCLUDED_HIGHWAYS: [&str; 8] = [
    "abandoned",
    "construction",
    "no",
    "planned",
    "platform",
    "proposed",
    "raceway",
    "razed",
];

/// Closed ways with these tags are still lines
const LINEAR_KEYS: [&str; 3] = ["highway", "railway", "barrier"];

/// `waterway` values describing areas rather than lines
const WATERWAY_AREAS: [&str; 3] = ["riverbank", "dock", "boatyard"];

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        #[serde(default)]
        geometry: Vec<LatLon>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<LatLon>,
}

/// Overpass bbox filter: `(south,west,north,east)`
pub fn bbox_filter(bbox: &Rect<f64>) -> String {
    format!(
        "({},{},{},{})",
        bbox.min().y,
        bbox.min().x,
        bbox.max().y,
        bbox.max().x
    )
}

/// Query for all routable ways
pub fn street_network_query(bbox: &Rect<f64>, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\nway[\"highway\"][\"area\"!~\"yes\"][\"highway\"!~\"{}\"]{};\nout geom;",
        EXCLUDED_HIGHWAYS.join("|"),
        bbox_filter(bbox)
    )
}

/// Query for nodes, ways and relations matching `filter`
pub fn features_query(bbox: &Rect<f64>, filter: &TagFilter, timeout_secs: u64) -> String {
    let area = bbox_filter(bbox);
    let selectors: String = filter
        .0
        .iter()
        .map(|(key, rule)| match rule {
            TagMatch::Any => format!("  nwr[\"{key}\"]{area};\n"),
            TagMatch::Values(values) => {
                format!("  nwr[\"{key}\"~\"^({})$\"]{area};\n", values.join("|"))
            }
        })
        .collect();
    format!("[out:json][timeout:{timeout_secs}];\n(\n{selectors});\nout geom;")
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

/// Whether a closed way describes an area
fn is_area(tags: &BTreeMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => return true,
        Some("no") => return false,
        _ => {}
    }
    if LINEAR_KEYS.iter().any(|k| tags.contains_key(*k)) {
        return false;
    }
    if let Some(waterway) = tags.get("waterway") {
        return WATERWAY_AREAS.contains(&waterway.as_str());
    }
    if tags.get("natural").is_some_and(|v| v == "coastline") {
        return false;
    }
    !tags
        .get("aeroway")
        .is_some_and(|v| v == "runway" || v == "taxiway")
}

fn way_geometry(coords: Vec<Coord<f64>>, tags: &BTreeMap<String, String>) -> Option<Geometry<f64>> {
    if coords.len() < 2 {
        return None;
    }
    if is_closed(&coords) && is_area(tags) {
        Some(Geometry::Polygon(Polygon::new(LineString(coords), Vec::new())))
    } else {
        Some(Geometry::LineString(LineString(coords)))
    }
}

/// Join way fragments end to end into closed rings
///
/// Fragments may run in either direction. Chains that never close are
/// dropped.
pub fn assemble_rings(mut fragments: Vec<Vec<Coord<f64>>>) -> Vec<Vec<Coord<f64>>> {
    fragments.retain(|f| f.len() >= 2);
    fragments.reverse();

    let mut rings = Vec::new();
    while let Some(mut ring) = fragments.pop() {
        loop {
            if is_closed(&ring) {
                rings.push(ring);
                break;
            }
            let Some(end) = ring.last().copied() else {
                break;
            };
            let next = fragments
                .iter()
                .position(|f| f.first() == Some(&end) || f.last() == Some(&end));
            let Some(i) = next else {
                tracing::debug!("Dropping unclosed ring with {} points", ring.len());
                break;
            };
            let mut fragment = fragments.remove(i);
            if fragment.first() != Some(&end) {
                fragment.reverse();
            }
            ring.extend(fragment.into_iter().skip(1));
        }
    }
    rings
}

fn relation_geometry(members: Vec<Member>, tags: &BTreeMap<String, String>) -> Option<Geometry<f64>> {
    let ways = members.into_iter().filter(|m| m.kind == "way" && m.geometry.len() >= 2);

    let is_multipolygon = matches!(
        tags.get("type").map(String::as_str),
        Some("multipolygon" | "boundary")
    );
    if !is_multipolygon {
        let lines: Vec<LineString<f64>> = ways
            .map(|m| LineString(m.geometry.into_iter().map(Coord::from).collect()))
            .collect();
        return (!lines.is_empty()).then(|| Geometry::MultiLineString(MultiLineString(lines)));
    }

    let mut outer = Vec::new();
    let mut inner = Vec::new();
    for member in ways {
        let coords: Vec<Coord<f64>> = member.geometry.into_iter().map(Coord::from).collect();
        if member.role == "inner" {
            inner.push(coords);
        } else {
            outer.push(coords);
        }
    }

    let mut polygons = polygons_from_rings(assemble_rings(outer), assemble_rings(inner));
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon(polygons))),
    }
}

fn parse_response(url: &str, body: &str) -> Result<OverpassResponse, FetchError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse {
            url: url.to_string(),
            error: e.to_string(),
        })?;
    if let Some(remark) = &response.remark {
        tracing::warn!("Overpass remark: {remark}");
    }
    Ok(response)
}

/// Convert an Overpass `out geom` response to features
pub fn parse_features(url: &str, body: &str) -> Result<Vec<Feature>, FetchError> {
    let response = parse_response(url, body)?;
    let features = response
        .elements
        .into_iter()
        .filter_map(|element| {
            let (geometry, tags) = match element {
                Element::Node { lat, lon, tags } => (Some(Geometry::Point(Point::new(lon, lat))), tags),
                Element::Way { geometry, tags } => {
                    let coords = geometry.into_iter().map(Coord::from).collect();
                    (way_geometry(coords, &tags), tags)
                }
                Element::Relation { members, tags } => (relation_geometry(members, &tags), tags),
                Element::Other => return None,
            };
            geometry.map(|geometry| Feature { geometry, tags })
        })
        .collect();
    Ok(features)
}

/// Convert an Overpass `out geom` response of highway ways to a street network
pub fn parse_street_network(url: &str, body: &str) -> Result<StreetNetwork, FetchError> {
    let response = parse_response(url, body)?;
    let edges = response
        .elements
        .into_iter()
        .filter_map(|element| match element {
            Element::Way { geometry, mut tags } if geometry.len() >= 2 => Some(RoadEdge {
                highway: tags.remove("highway"),
                line: LineString(geometry.into_iter().map(Coord::from).collect()),
            }),
            _ => None,
        })
        .collect();
    Ok(StreetNetwork { edges })
}

/// Overpass interpreter client
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new(
            urls::OVERPASS_API,
            defaults::USER_AGENT,
            Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        )
    }
}

impl OverpassClient {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout + Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.to_string(),
            timeout_secs: timeout.as_secs().max(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run a query and return the raw response body
    pub async fn query(&self, query: &str) -> Result<String, FetchError> {
        let network_err = |error: String| FetchError::Network {
            url: self.url.clone(),
            error,
        };

        tracing::debug!("Overpass query:\n{query}");
        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| network_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(network_err(format!("HTTP {}", response.status())));
        }

        response.text().await.map_err(|e| network_err(e.to_string()))
    }

    pub async fn street_network(&self, bbox: &Rect<f64>) -> Result<StreetNetwork, FetchError> {
        let body = self.query(&street_network_query(bbox, self.timeout_secs)).await?;
        let network = parse_street_network(&self.url, &body)?;
        if network.is_empty() {
            return Err(FetchError::MissingStreetNetwork);
        }
        tracing::debug!("Received {} street segments", network.edges.len());
        Ok(network)
    }

    pub async fn features(&self, bbox: &Rect<f64>, filter: &TagFilter) -> Result<Vec<Feature>, FetchError> {
        let body = self.query(&features_query(bbox, filter, self.timeout_secs)).await?;
        let features = parse_features(&self.url, &body)?;
        if features.is_empty() {
            return Err(FetchError::NoFeatures {
                layer: filter.to_string(),
            });
        }
        tracing::debug!("Received {} features for {filter}", features.len());
        Ok(features)
    }
}

/// Reports `(downloaded, total)` bytes of the water polygon dataset
pub type DatasetProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Overpass for streets and features, the water polygon dataset for oceans
#[derive(Clone)]
pub struct OsmSource {
    overpass: OverpassClient,
    water: WaterPolygons,
    download_progress: Option<DatasetProgress>,
}

impl OsmSource {
    pub fn new(overpass: OverpassClient, water: WaterPolygons) -> Self {
        Self {
            overpass,
            water,
            download_progress: None,
        }
    }

    /// Report progress when the water polygon dataset is downloaded
    #[must_use]
    pub fn with_download_progress(mut self, progress: DatasetProgress) -> Self {
        self.download_progress = Some(progress);
        self
    }

    pub fn overpass(&self) -> &OverpassClient {
        &self.overpass
    }

    pub fn water(&self) -> &WaterPolygons {
        &self.water
    }
}

impl MapDataSource for OsmSource {
    async fn street_network(&self, bbox: Rect<f64>) -> Result<StreetNetwork, FetchError> {
        self.overpass.street_network(&bbox).await
    }

    async fn features(&self, bbox: Rect<f64>, filter: &TagFilter) -> Result<Vec<Feature>, FetchError> {
        self.overpass.features(&bbox, filter).await
    }

    async fn ocean(&self, bbox: Rect<f64>) -> Result<Vec<Feature>, FetchError> {
        let progress = self.download_progress.clone().map(|report| {
            Box::new(move |done: u64, total: u64| report(done, total)) as ProgressCallback
        });
        self.water.ensure(progress).await?;
        let water = self.water.clone();
        tokio::task::spawn_blocking(move || water.clip(&bbox))
            .await
            .map_err(|e| FetchError::WaterPolygons {
                path: self.water.shapefile_path(),
                error: e.to_string(),
            })?
    }
}
