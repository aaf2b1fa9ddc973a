//! Map data fetching
//!
//! Runs a [`FetchPlan`] against a [`MapDataSource`], consulting the file
//! cache before every network request. Failures of individual feature
//! layers are logged and yield empty layers; a missing street network is
//! reported as `None` and left to the caller.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use geo_types::{Geometry, LineString, Rect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::core::coordinates::GeoPoint;
use crate::core::geometry::{bbox_around, total_bounds, union_rect};
use crate::core::layers::{LayerKind, LayerSpec, TagFilter, COASTLINE};
use crate::core::resolver::FetchPlan;
use crate::error::FetchError;
use crate::infra::cache::FileCache;

/// A tagged OSM feature in WGS84 (`x` = longitude, `y` = latitude)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// One street segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    /// Raw `highway` tag
    pub highway: Option<String>,
    pub line: LineString<f64>,
}

/// Street network of a region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreetNetwork {
    pub edges: Vec<RoadEdge>,
}

impl StreetNetwork {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Provider of raw map data
pub trait MapDataSource {
    /// Routable streets inside `bbox`
    fn street_network(
        &self,
        bbox: Rect<f64>,
    ) -> impl Future<Output = Result<StreetNetwork, FetchError>> + Send;

    /// Features inside `bbox` matching `filter`
    fn features(
        &self,
        bbox: Rect<f64>,
        filter: &TagFilter,
    ) -> impl Future<Output = Result<Vec<Feature>, FetchError>> + Send;

    /// Ocean polygons clipped to `bbox`
    fn ocean(&self, bbox: Rect<f64>) -> impl Future<Output = Result<Vec<Feature>, FetchError>> + Send;
}

/// Pauses after network requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchDelays {
    pub graph: Duration,
    pub features: Duration,
}

impl Default for FetchDelays {
    fn default() -> Self {
        Self {
            graph: Duration::from_millis(defaults::GRAPH_DELAY_MS),
            features: Duration::from_millis(defaults::FEATURES_DELAY_MS),
        }
    }
}

impl FetchDelays {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            graph: Duration::ZERO,
            features: Duration::ZERO,
        }
    }
}

/// Fetched data per layer
#[derive(Debug, Clone, Default)]
pub struct LayerData {
    streets: Option<StreetNetwork>,
    features: HashMap<&'static str, Vec<Feature>>,
}

impl LayerData {
    /// Street network, if it was requested and retrieved
    pub fn streets(&self) -> Option<&StreetNetwork> {
        self.streets.as_ref()
    }

    /// Features of a layer; empty if absent
    pub fn features(&self, layer: &str) -> &[Feature] {
        self.features.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Whether a layer was fetched
    pub fn contains(&self, layer: &str) -> bool {
        self.features.contains_key(layer)
    }

    pub fn set_streets(&mut self, streets: Option<StreetNetwork>) {
        self.streets = streets;
    }

    pub fn insert(&mut self, layer: &'static str, features: Vec<Feature>) {
        self.features.insert(layer, features);
    }
}

/// Cache key of a street network
pub fn graph_cache_key(center: GeoPoint, dist: f64) -> String {
    format!("graph_{}_{}_{dist}", center.lat, center.lon)
}

/// Cache key of a feature layer
pub fn features_cache_key(layer: &LayerSpec, filter: &TagFilter, center: GeoPoint, dist: f64) -> String {
    let keys: Vec<&str> = filter.keys().collect();
    format!(
        "{}_{}_{}_{dist}_{}",
        layer.cache_name,
        center.lat,
        center.lon,
        keys.join("_")
    )
}

/// Cache key of an ocean clip
pub fn ocean_cache_key(bbox: &Rect<f64>) -> String {
    format!(
        "ocean_{}_{}_{}_{}",
        bbox.min().x,
        bbox.min().y,
        bbox.max().x,
        bbox.max().y
    )
}

/// Region for ocean polygons: the point's surroundings plus the coastline
pub fn ocean_bbox(center: GeoPoint, dist: f64, coastline: &[Feature]) -> Rect<f64> {
    let around = bbox_around(center, dist);
    match total_bounds(coastline.iter().map(|f| &f.geometry)) {
        Some(bounds) => union_rect(around, bounds),
        None => around,
    }
}

/// Fetches the layers of a plan, with caching
pub struct Fetcher<S> {
    source: S,
    cache: FileCache,
    refresh: bool,
    delays: FetchDelays,
}

impl<S: MapDataSource> Fetcher<S> {
    pub fn new(source: S, cache: FileCache) -> Self {
        Self {
            source,
            cache,
            refresh: false,
            delays: FetchDelays::default(),
        }
    }

    /// Ignore cached entries (fresh results are still stored)
    #[must_use]
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    #[must_use]
    pub fn with_delays(mut self, delays: FetchDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Fetch every layer of `plan` in order
    ///
    /// `progress` is called once per layer before it is fetched.
    pub async fn fetch_layers(
        &self,
        center: GeoPoint,
        dist: f64,
        plan: &FetchPlan,
        progress: impl Fn(&'static LayerSpec),
    ) -> LayerData {
        let mut data = LayerData::default();

        for &layer in plan.steps() {
            progress(layer);
            match &layer.kind {
                LayerKind::StreetNetwork => {
                    let streets = self.street_network(center, dist).await;
                    data.set_streets(streets);
                }
                LayerKind::Features(filter) => {
                    let features = self.features(layer, filter, center, dist).await;
                    data.insert(layer.name, features);
                }
                LayerKind::Ocean => {
                    let ocean = self.ocean(center, dist, data.features(COASTLINE)).await;
                    data.insert(layer.name, ocean);
                }
            }
        }

        data
    }

    /// Street network around `center`, or `None` if it could not be fetched
    pub async fn street_network(&self, center: GeoPoint, dist: f64) -> Option<StreetNetwork> {
        let key = graph_cache_key(center, dist);
        let result = self
            .cached(&key, || async {
                let network = self.source.street_network(bbox_around(center, dist)).await?;
                tokio::time::sleep(self.delays.graph).await;
                Ok::<_, FetchError>(network)
            })
            .await;

        match result {
            Ok(network) => Some(network),
            Err(e) => {
                tracing::warn!("Error while fetching street network: {e}");
                None
            }
        }
    }

    /// Features of a layer; failures yield an empty collection
    pub async fn features(
        &self,
        layer: &LayerSpec,
        filter: &TagFilter,
        center: GeoPoint,
        dist: f64,
    ) -> Vec<Feature> {
        let key = features_cache_key(layer, filter, center, dist);
        let result = self
            .cached(&key, || async {
                let features = self.source.features(bbox_around(center, dist), filter).await?;
                tokio::time::sleep(self.delays.features).await;
                Ok::<_, FetchError>(features)
            })
            .await;

        match result {
            Ok(features) => features,
            Err(FetchError::NoFeatures { .. }) => {
                tracing::debug!("No {} found", layer.name);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Error while fetching {}: {e}", layer.name);
                Vec::new()
            }
        }
    }

    /// Ocean polygons, only where a coastline exists
    pub async fn ocean(&self, center: GeoPoint, dist: f64, coastline: &[Feature]) -> Vec<Feature> {
        if coastline.is_empty() {
            tracing::debug!("No coastline nearby, skipping ocean polygons");
            return Vec::new();
        }

        let bbox = ocean_bbox(center, dist, coastline);
        let key = ocean_cache_key(&bbox);
        let result = self
            .cached(&key, || async { self.source.ocean(bbox).await })
            .await;

        result.unwrap_or_else(|e| {
            tracing::warn!("Error while loading ocean polygons: {e}");
            Vec::new()
        })
    }

    /// Return the cached value for `key` or fetch and store it
    async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if !self.refresh {
            match self.cache.get::<T>(key) {
                Ok(Some(value)) => {
                    tracing::info!("Using cached {key}");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{e}; fetching again"),
            }
        }

        let value = fetch().await?;
        if let Err(e) = self.cache.set(key, &value) {
            tracing::warn!("{e}");
        }
        Ok(value)
    }
}
