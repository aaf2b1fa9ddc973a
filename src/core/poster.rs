//! End-to-end poster generation
//!
//! Fetches every layer a poster needs, then renders and writes one file per
//! theme. Fetched data can be shared between themes.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::core::coordinates::GeoPoint;
use crate::core::export::{write_output, FontSources, OutputFormat};
use crate::core::fetch::{Fetcher, LayerData, MapDataSource};
use crate::core::fonts::resolve_typeface;
use crate::core::geometry::compensated_distance;
use crate::core::layers::{LayerSpec, ROADS};
use crate::core::render::{render_svg, RenderSettings, Scene};
use crate::core::resolver::FetchPlan;
use crate::core::theme::Theme;
use crate::error::{FetchError, PosterError};

/// Everything needed to produce one poster
#[derive(Debug, Clone)]
pub struct PosterRequest {
    /// Place name used for the output directory and file name
    pub city: String,
    /// Text drawn as the city name
    pub display_city: String,
    /// Text drawn as the country name
    pub display_country: String,
    pub center: GeoPoint,
    /// Requested map radius in meters
    pub dist: f64,
    pub format: OutputFormat,
    pub settings: RenderSettings,
    /// Local fonts directory
    pub fonts_dir: PathBuf,
}

impl PosterRequest {
    /// Fetch radius covering the poster after cropping and rotation
    pub fn fetch_distance(&self) -> f64 {
        compensated_distance(
            self.dist,
            self.settings.width_in,
            self.settings.height_in,
            self.settings.rotation_deg,
        )
    }
}

/// Fetch all enabled layers for `request`
///
/// Fails only if roads are enabled and the street network is unavailable.
pub async fn fetch_poster_data<S: MapDataSource>(
    request: &PosterRequest,
    fetcher: &Fetcher<S>,
    progress: impl Fn(&'static LayerSpec),
) -> Result<LayerData, PosterError> {
    let plan = FetchPlan::new(&request.settings.layers)?;
    let dist = request.fetch_distance();
    tracing::info!(
        "Fetching {} layers within {dist:.0} m of {}",
        plan.len(),
        request.center
    );

    let data = fetcher.fetch_layers(request.center, dist, &plan, progress).await;
    if plan.contains(ROADS) && data.streets().is_none() {
        return Err(FetchError::MissingStreetNetwork.into());
    }
    Ok(data)
}

/// Render fetched data with `theme` and write it to `output`
pub fn render_poster(
    request: &PosterRequest,
    data: &LayerData,
    theme: &Theme,
    output: &Path,
) -> Result<(), PosterError> {
    let typeface = resolve_typeface(&request.fonts_dir, request.settings.text.font_family());
    let scene = Scene {
        data,
        theme,
        typeface: &typeface,
        center: request.center,
        dist: request.fetch_distance(),
        city: &request.display_city,
        country: &request.display_country,
    };
    let svg = render_svg(&scene, &request.settings)?;

    let fonts = FontSources {
        fonts_dir: Some(&request.fonts_dir),
        fallback_family: Some(&typeface.regular.family),
    };
    write_output(&svg, request.format, request.settings.dpi, output, &fonts)?;
    tracing::info!("Saved {}", output.display());
    Ok(())
}

/// Fetch, render and write a single poster
pub async fn create_poster<S: MapDataSource>(
    request: &PosterRequest,
    theme: &Theme,
    fetcher: &Fetcher<S>,
    output: &Path,
    progress: impl Fn(&'static LayerSpec),
) -> Result<PathBuf, PosterError> {
    let data = fetch_poster_data(request, fetcher, progress).await?;
    render_poster(request, &data, theme, output)?;
    Ok(output.to_path_buf())
}

/// `<posters>/<city>/<city_slug>_<theme>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn output_filename(
    posters_dir: &Path,
    city: &str,
    theme: &str,
    format: OutputFormat,
    now: NaiveDateTime,
) -> PathBuf {
    let dir_name = city.replace(['/', '\\'], "_");
    let slug = dir_name.to_lowercase().replace(' ', "_");
    let timestamp = now.format("%Y%m%d_%H%M%S");
    posters_dir
        .join(&dir_name)
        .join(format!("{slug}_{theme}_{timestamp}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetch::{FetchDelays, Feature, RoadEdge, StreetNetwork};
    use crate::core::layers::TagFilter;
    use crate::infra::cache::FileCache;
    use chrono::NaiveDate;
    use geo_types::{line_string, polygon, Geometry, Rect};
    use tempfile::TempDir;

    struct StaticSource {
        streets: bool,
    }

    impl MapDataSource for StaticSource {
        async fn street_network(&self, _bbox: Rect<f64>) -> Result<StreetNetwork, FetchError> {
            if !self.streets {
                return Err(FetchError::Network {
                    url: "static".to_string(),
                    error: "offline".to_string(),
                });
            }
            Ok(StreetNetwork {
                edges: vec![RoadEdge {
                    highway: Some("primary".to_string()),
                    line: line_string![(x: 2.34, y: 48.85), (x: 2.36, y: 48.86)],
                }],
            })
        }

        async fn features(&self, _bbox: Rect<f64>, _filter: &TagFilter) -> Result<Vec<Feature>, FetchError> {
            Ok(vec![Feature::new(Geometry::Polygon(polygon![
                (x: 2.350, y: 48.855),
                (x: 2.355, y: 48.855),
                (x: 2.355, y: 48.858),
            ]))])
        }

        async fn ocean(&self, _bbox: Rect<f64>) -> Result<Vec<Feature>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn theme() -> Theme {
        serde_json::from_value(serde_json::json!({
            "name": "Test",
            "bg": "#FFFFFF",
            "text": "#000000",
            "gradient_color": "#FFFFFF",
            "water": "#C0D0E0",
            "parks": "#D0E0C0",
            "road_default": "#333333",
        }))
        .unwrap()
    }

    fn request(temp: &TempDir, format: OutputFormat) -> PosterRequest {
        let mut settings = RenderSettings::new(4.0, 6.0, 72);
        settings.layers = vec!["roads".to_string(), "water".to_string()];
        PosterRequest {
            city: "Paris".to_string(),
            display_city: "Paris".to_string(),
            display_country: "France".to_string(),
            center: GeoPoint::new(48.8566, 2.3522),
            dist: 3000.0,
            format,
            settings,
            fonts_dir: temp.path().join("fonts"),
        }
    }

    fn fetcher(temp: &TempDir, streets: bool) -> Fetcher<StaticSource> {
        Fetcher::new(StaticSource { streets }, FileCache::new(temp.path().join("cache")))
            .with_delays(FetchDelays::none())
    }

    #[test]
    fn test_output_filename() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let path = output_filename(Path::new("posters"), "New York", "noir", OutputFormat::Png, now);
        assert_eq!(
            path,
            PathBuf::from("posters/New York/new_york_noir_20260102_030405.png")
        );

        let path = output_filename(Path::new("out"), "A/B", "ocean", OutputFormat::Pdf, now);
        assert_eq!(path, PathBuf::from("out/A_B/a_b_ocean_20260102_030405.pdf"));
    }

    #[test]
    fn test_fetch_distance_is_compensated() {
        let temp = TempDir::new().unwrap();
        let request = request(&temp, OutputFormat::Svg);
        // 6:4 aspect ratio without rotation
        assert!((request.fetch_distance() - 3000.0 * 1.5 / 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_poster_writes_svg() {
        let temp = TempDir::new().unwrap();
        let request = request(&temp, OutputFormat::Svg);
        let output = temp.path().join("posters/paris.svg");
        let counter = std::cell::Cell::new(0);

        let path = create_poster(&request, &theme(), &fetcher(&temp, true), &output, |_| {
            counter.set(counter.get() + 1);
        })
        .await
        .unwrap();

        assert_eq!(path, output);
        assert_eq!(counter.get(), 2);
        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains(r##"fill="#c0d0e0""##));
        assert!(svg.contains("P  A  R  I  S"));
    }

    #[tokio::test]
    async fn test_missing_street_network_is_fatal_when_roads_enabled() {
        let temp = TempDir::new().unwrap();
        let request = request(&temp, OutputFormat::Svg);
        let result = fetch_poster_data(&request, &fetcher(&temp, false), |_| {}).await;
        assert!(matches!(
            result,
            Err(PosterError::Fetch(FetchError::MissingStreetNetwork))
        ));
    }

    #[tokio::test]
    async fn test_missing_street_network_ignored_without_roads() {
        let temp = TempDir::new().unwrap();
        let mut request = request(&temp, OutputFormat::Svg);
        request.settings.layers = vec!["water".to_string()];
        let data = fetch_poster_data(&request, &fetcher(&temp, false), |_| {})
            .await
            .unwrap();
        assert_eq!(data.features("water").len(), 1);
    }

    #[tokio::test]
    async fn test_render_poster_png() {
        let temp = TempDir::new().unwrap();
        let mut request = request(&temp, OutputFormat::Png);
        request.settings.text.show_city = false;
        request.settings.text.show_country = false;
        request.settings.text.show_coords = false;
        request.settings.text.show_attribution = false;

        let data = fetch_poster_data(&request, &fetcher(&temp, true), |_| {})
            .await
            .unwrap();
        let output = temp.path().join("paris.png");
        render_poster(&request, &data, &theme(), &output).unwrap();

        let png = std::fs::read(&output).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
