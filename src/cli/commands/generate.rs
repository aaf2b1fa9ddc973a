//! CLI command for `mapposter generate`
//!
//! Command-line flags are overlaid on an optional saved configuration, so a
//! poster can be reproduced with `--config` after `--save-config`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{self, status};
use crate::core::coordinates::GeoPoint;
use crate::core::fetch::{FetchDelays, Fetcher};
use crate::core::layers;
use crate::core::poster::{fetch_poster_data, output_filename, render_poster, PosterRequest};
use crate::core::poster_config::{inches_to_mm, GradientOrientation, PlaceQuery, PosterConfig};
use crate::core::render::{fade_sides, Fade, RenderSettings};
use crate::core::resolver::FetchPlan;
use crate::core::roads;
use crate::core::settings::Settings;
use crate::core::theme::{select_themes, Theme};
use crate::error::ConfigError;
use crate::infra::cache::{format_size, FileCache};
use crate::infra::dirs::PosterDirs;
use crate::infra::geocoder::Geocoder;
use crate::infra::overpass::{OsmSource, OverpassClient};
use crate::infra::water::WaterPolygons;

/// Arguments of `mapposter generate`
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// City name
    #[arg(short = 'c', long)]
    pub city: Option<String>,

    /// Country name
    #[arg(short = 'C', long)]
    pub country: Option<String>,

    /// Centre as `lat, lon` or a map link, instead of geocoding
    #[arg(long, allow_hyphen_values = true)]
    pub coords: Option<String>,

    /// City text drawn on the poster
    #[arg(long)]
    pub name_label: Option<String>,

    /// Country text drawn on the poster
    #[arg(long)]
    pub country_label: Option<String>,

    /// Theme name
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Generate one poster per available theme
    #[arg(long)]
    pub all_themes: bool,

    /// Map radius in meters
    #[arg(short, long)]
    pub distance: Option<u32>,

    /// Poster width in inches
    #[arg(short = 'W', long)]
    pub width: Option<f64>,

    /// Poster height in inches
    #[arg(short = 'H', long)]
    pub height: Option<f64>,

    /// Output format: png, svg or pdf
    #[arg(short, long)]
    pub format: Option<String>,

    /// Resolution for PNG output
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Fetch map data again instead of using the cache
    #[arg(short = 'R', long)]
    pub refresh_cache: bool,

    /// Counter-clockwise map rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: Option<f64>,

    /// Layers to draw, comma separated
    #[arg(long, value_delimiter = ',')]
    pub layers: Option<Vec<String>>,

    /// Road classes to draw, comma separated; `_link` roads are included
    #[arg(long, value_delimiter = ',')]
    pub road_types: Option<Vec<String>>,

    /// Disable the edge fades
    #[arg(long)]
    pub no_gradient: bool,

    /// Fade depth in percent of the poster side
    #[arg(long)]
    pub gradient_percent: Option<f64>,

    /// Faded sides: vertical, horizontal or both
    #[arg(long)]
    pub gradient_orientation: Option<String>,

    /// Mark a point of interest at `lat, lon` or a map link
    #[arg(long, allow_hyphen_values = true)]
    pub poi: Option<String>,

    /// SVG file drawn as the marker
    #[arg(long)]
    pub poi_svg: Option<PathBuf>,

    /// Marker size in points
    #[arg(long)]
    pub poi_size: Option<f64>,

    /// Marker color
    #[arg(long)]
    pub poi_color: Option<String>,

    /// Font family from the fonts directory or the system
    #[arg(long)]
    pub font: Option<String>,

    /// Hide the coordinates line
    #[arg(long)]
    pub hide_coords: bool,

    /// Hide the attribution
    #[arg(long)]
    pub hide_attribution: bool,

    /// Load a saved poster configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save the effective configuration to a file
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Directory for generated posters
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

fn overwrite(target: &mut String, value: Option<&String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

impl GenerateArgs {
    /// Overlay the flags that were given on `config`
    pub fn apply_to(&self, config: &mut PosterConfig) {
        overwrite(&mut config.city, self.city.as_ref());
        overwrite(&mut config.country, self.country.as_ref());
        overwrite(&mut config.coords, self.coords.as_ref());
        overwrite(&mut config.name_label, self.name_label.as_ref());
        overwrite(&mut config.country_label, self.country_label.as_ref());
        overwrite(&mut config.theme, self.theme.as_ref());
        overwrite(&mut config.format, self.format.as_ref());

        if let Some(distance) = self.distance {
            config.distance = Some(f64::from(distance));
        }
        if let Some(width) = self.width {
            config.width_mm = Some(inches_to_mm(width));
        }
        if let Some(height) = self.height {
            config.height_mm = Some(inches_to_mm(height));
        }
        if let Some(dpi) = self.dpi {
            config.dpi = Some(f64::from(dpi));
        }
        if let Some(rotation) = self.rotation {
            config.rotation = Some(rotation);
        }
        config.all_themes |= self.all_themes;
        config.refresh_cache |= self.refresh_cache;

        if let Some(layers) = &self.layers {
            config.enabled_layers = Some(layers.clone());
        }
        if let Some(road_types) = &self.road_types {
            config.road_types = Some(roads::expand_road_types(road_types));
        }

        if self.no_gradient {
            config.gradient.enabled = false;
        }
        if let Some(percent) = self.gradient_percent {
            config.gradient.percent = Some(percent);
        }
        if let Some(orientation) = &self.gradient_orientation {
            config.gradient.orientation = GradientOrientation::from(orientation.clone());
        }

        if let Some(location) = &self.poi {
            config.poi.enabled = true;
            config.poi.location.clone_from(location);
        }
        if let Some(svg) = &self.poi_svg {
            config.poi.svg_path = svg.display().to_string();
        }
        if let Some(size) = self.poi_size {
            config.poi.size = Some(size);
        }
        overwrite(&mut config.poi.color, self.poi_color.as_ref());

        overwrite(&mut config.text_options.font_family, self.font.as_ref());
        if self.hide_coords {
            config.text_options.show_coords = false;
        }
        if self.hide_attribution {
            config.text_options.show_attribution = false;
        }
    }

    /// Road filter: every road unless classes were chosen here or in a saved configuration
    fn road_filter(&self, config: &PosterConfig) -> Option<Vec<String>> {
        (self.config.is_some() || self.road_types.is_some()).then(|| config.highway_filter())
    }
}

/// Presentation settings for a configuration
pub fn render_settings(
    config: &PosterConfig,
    default_dpi: u32,
    road_filter: Option<Vec<String>>,
) -> Result<RenderSettings, ConfigError> {
    let mut settings = RenderSettings::new(config.width_in()?, config.height_in()?, config.dpi(default_dpi)?);
    settings.rotation_deg = config.rotation_deg();
    settings.layers = config.layers();
    settings.road_filter = road_filter;
    settings.fade = config.gradient.enabled.then(|| Fade {
        sides: fade_sides(config.gradient.orientation),
        fraction: config.gradient.fraction(),
    });
    settings.text = config.text_options.clone();
    settings.marker = config.poi.marker()?;
    Ok(settings)
}

async fn resolve_center(config: &PosterConfig, settings: &Settings, cache: &FileCache) -> Result<GeoPoint> {
    match config.place()? {
        PlaceQuery::Coordinates(point) => {
            tracing::info!("Using coordinates {point}");
            Ok(point)
        }
        PlaceQuery::Named { city, country } => {
            let geocoder = Geocoder::new(settings.nominatim_url(), settings.user_agent(), settings.timeout())
                .with_delay(settings.geocode_delay());
            let spinner = output::create_spinner(&format!("Looking up {city}, {country}..."));
            let result = geocoder.locate(&city, &country, config.refresh_cache, cache).await;
            spinner.finish_and_clear();

            let point = result.with_context(|| format!("Could not find coordinates for {city}, {country}"))?;
            output::print_status(status::INFO, &format!("Coordinates: {point}"));
            Ok(point)
        }
    }
}

/// Execute the generate command
pub async fn execute(args: GenerateArgs) -> Result<()> {
    let dirs = PosterDirs::new();
    let settings = Settings::load(&dirs)?;

    let mut config = match &args.config {
        Some(path) => PosterConfig::load(path)?,
        None => PosterConfig::default(),
    };
    args.apply_to(&mut config);

    if let Some(names) = &args.layers {
        for name in names {
            layers::require(name)?;
        }
    }

    if let Some(path) = &args.save_config {
        config.save(path)?;
        output::print_status(status::SUCCESS, &format!("Saved configuration to {}", path.display()));
    }

    let themes_dir = dirs.themes_dir();
    let themes = select_themes(&themes_dir, config.theme_name(settings.default_theme()), config.all_themes)?;
    let format = config.output_format(settings.default_format())?;
    let posters_dir = args.output_dir.clone().unwrap_or_else(|| settings.posters_dir());

    let cache = FileCache::from_dirs(&dirs);
    let center = resolve_center(&config, &settings, &cache).await?;

    let request = PosterRequest {
        city: config.city_name(),
        display_city: config.display_city(),
        display_country: config.display_country(),
        center,
        dist: config.distance_m(settings.default_distance())?,
        format,
        settings: render_settings(&config, settings.default_dpi(), args.road_filter(&config))?,
        fonts_dir: dirs.fonts_dir(),
    };

    let plan = FetchPlan::new(&request.settings.layers)?;
    let bar = output::create_layer_bar(plan.len() as u64);
    let download_bar = bar.clone();
    let source = OsmSource::new(
        OverpassClient::new(settings.overpass_url(), settings.user_agent(), settings.timeout()),
        WaterPolygons::from_dirs(&dirs).with_url(settings.water_polygons_url()),
    )
    .with_download_progress(Arc::new(move |done, total| {
        download_bar.set_message(format!("Water polygons {}/{}", format_size(done), format_size(total)));
    }));
    let fetcher = Fetcher::new(source, cache)
        .with_refresh(config.refresh_cache)
        .with_delays(FetchDelays {
            graph: settings.graph_delay(),
            features: settings.features_delay(),
        });

    output::print_status(
        status::INFO,
        &format!("Generating map for {}, {}", request.display_city, request.display_country),
    );
    let data = fetch_poster_data(&request, &fetcher, |layer| {
        bar.set_message(format!("Downloading {}", layer.label));
        bar.inc(1);
    })
    .await;
    bar.finish_and_clear();
    let data = data?;

    let mut written = Vec::with_capacity(themes.len());
    for name in &themes {
        let theme = Theme::load(&themes_dir, name)?;
        let path = output_filename(
            &posters_dir,
            &request.city,
            name,
            format,
            chrono::Local::now().naive_local(),
        );

        let spinner = output::create_spinner(&format!("Rendering {name}..."));
        let result = render_poster(&request, &data, &theme, &path);
        spinner.finish_and_clear();
        result.with_context(|| format!("Failed to render theme '{name}'"))?;

        output::print_status(status::SUCCESS, &format!("Saved {}", path.display()));
        written.push(path);
    }

    output::print_json(&serde_json::json!({
        "center": { "lat": request.center.lat, "lon": request.center.lon },
        "outputs": written,
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::Commands;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> GenerateArgs {
        let mut argv = vec!["mapposter", "generate"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Some(Commands::Generate(args)) => *args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_short_flags() {
        let args = parse(&["-c", "Paris", "-C", "France", "-t", "noir", "-d", "5000", "-W", "8", "-H", "10"]);
        assert_eq!(args.city.as_deref(), Some("Paris"));
        assert_eq!(args.country.as_deref(), Some("France"));
        assert_eq!(args.theme.as_deref(), Some("noir"));
        assert_eq!(args.distance, Some(5000));
        assert_eq!(args.width, Some(8.0));
        assert_eq!(args.height, Some(10.0));
    }

    #[test]
    fn test_parse_lists_and_negative_values() {
        let args = parse(&["--layers", "roads,water", "--rotation", "-15", "--coords", "-33.86, 151.2"]);
        assert_eq!(args.layers, Some(vec!["roads".to_string(), "water".to_string()]));
        assert_eq!(args.rotation, Some(-15.0));
        assert_eq!(args.coords.as_deref(), Some("-33.86, 151.2"));
    }

    #[test]
    fn test_apply_overrides_config() {
        let mut config = PosterConfig {
            city: "Lyon".to_string(),
            theme: "ocean".to_string(),
            ..PosterConfig::default()
        };
        let args = GenerateArgs {
            city: Some("Paris".to_string()),
            width: Some(12.0),
            dpi: Some(150),
            no_gradient: true,
            poi: Some("48.85, 2.35".to_string()),
            hide_attribution: true,
            road_types: Some(vec!["primary".to_string()]),
            ..GenerateArgs::default()
        };
        args.apply_to(&mut config);

        assert_eq!(config.city, "Paris");
        assert_eq!(config.theme, "ocean");
        assert_eq!(config.width_mm, Some(304.8));
        assert_eq!(config.dpi, Some(150.0));
        assert!(!config.gradient.enabled);
        assert!(config.poi.enabled);
        assert!(!config.text_options.show_attribution);
        assert_eq!(
            config.road_types,
            Some(vec!["primary".to_string(), "primary_link".to_string()])
        );
    }

    #[test]
    fn test_render_settings_from_config() {
        let mut config = PosterConfig {
            width_mm: Some(304.8),
            height_mm: Some(406.4),
            rotation: Some(10.0),
            ..PosterConfig::default()
        };
        config.gradient.percent = Some(10.0);
        config.gradient.orientation = GradientOrientation::Both;

        let settings = render_settings(&config, 300, None).unwrap();
        assert!((settings.width_in - 12.0).abs() < 1e-9);
        assert!((settings.height_in - 16.0).abs() < 1e-9);
        assert_eq!(settings.dpi, 300);
        assert!((settings.rotation_deg - 10.0).abs() < 1e-9);
        assert!(settings.road_filter.is_none());
        assert!(settings.marker.is_none());
        let fade = settings.fade.unwrap();
        assert_eq!(fade.sides.len(), 4);
        assert!((fade.fraction - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_render_settings_rejects_bad_marker() {
        let mut config = PosterConfig::default();
        config.poi.enabled = true;
        config.poi.location = "not a place".to_string();
        assert!(render_settings(&config, 300, None).is_err());
    }

    #[test]
    fn test_road_filter_only_when_chosen() {
        let config = PosterConfig::default();
        assert!(GenerateArgs::default().road_filter(&config).is_none());

        let args = GenerateArgs {
            road_types: Some(vec!["motorway".to_string()]),
            ..GenerateArgs::default()
        };
        let mut config = PosterConfig::default();
        args.apply_to(&mut config);
        let filter = args.road_filter(&config).unwrap();
        assert!(filter.contains(&"motorway".to_string()));
        assert!(filter.contains(&"motorway_link".to_string()));
        assert!(!filter.contains(&"residential".to_string()));
    }
}
