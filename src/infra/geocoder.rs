//! Place name geocoding against Nominatim

use std::time::Duration;

use serde::Deserialize;

use crate::config::{defaults, urls};
use crate::core::coordinates::GeoPoint;
use crate::error::GeocodeError;
use crate::infra::cache::FileCache;

/// One search hit; Nominatim returns coordinates as strings
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim search client
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    search_url: String,
    delay: Duration,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new(
            urls::NOMINATIM_SEARCH,
            defaults::USER_AGENT,
            Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        )
    }
}

impl Geocoder {
    pub fn new(search_url: &str, user_agent: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            search_url: search_url.to_string(),
            delay: Duration::from_millis(defaults::GEOCODE_DELAY_MS),
        }
    }

    /// Pause before each uncached request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cache key for a place
    pub fn cache_key(city: &str, country: &str) -> String {
        format!("coords_{}_{}", city.to_lowercase(), country.to_lowercase())
    }

    /// Coordinates of `city, country`, from the cache when possible
    pub async fn locate(
        &self,
        city: &str,
        country: &str,
        refresh: bool,
        cache: &FileCache,
    ) -> Result<GeoPoint, GeocodeError> {
        let key = Self::cache_key(city, country);
        if !refresh {
            match cache.get::<GeoPoint>(&key) {
                Ok(Some(point)) => {
                    tracing::info!("Using cached coordinates for {city}, {country}");
                    return Ok(point);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("{e}; geocoding again"),
            }
        }

        tokio::time::sleep(self.delay).await;
        let point = self.search(&format!("{city}, {country}")).await?;

        if let Err(e) = cache.set(&key, &point) {
            tracing::warn!("{e}");
        }
        Ok(point)
    }

    /// Query Nominatim for the best match
    pub async fn search(&self, query: &str) -> Result<GeoPoint, GeocodeError> {
        let request_error = |error: String| GeocodeError::Request {
            query: query.to_string(),
            error,
        };

        tracing::debug!("Geocoding '{query}'");
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(request_error(format!("HTTP {}", response.status())));
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        let hit = hits.into_iter().next().ok_or_else(|| GeocodeError::NotFound {
            query: query.to_string(),
        })?;

        let lat = hit.lat.parse::<f64>().map_err(|e| request_error(e.to_string()))?;
        let lon = hit.lon.parse::<f64>().map_err(|e| request_error(e.to_string()))?;
        if let Some(name) = &hit.display_name {
            tracing::info!("Found: {name}");
        }
        Ok(GeoPoint::new(lat, lon))
    }
}
