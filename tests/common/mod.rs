//! Common test utilities and helpers
//!
//! Every test gets its own cache, config and data directories so runs never
//! touch the user's files or the network.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use geo_types::{line_string, polygon, Geometry};
use mapposter::core::coordinates::GeoPoint;
use mapposter::core::fetch::{features_cache_key, graph_cache_key, Feature, RoadEdge, StreetNetwork};
use mapposter::core::layers::{self, LayerKind};
use mapposter::infra::cache::FileCache;
use tempfile::TempDir;

/// Unreachable endpoint so that a cache miss fails fast
pub const DEAD_URL: &str = "http://127.0.0.1:9/api";

/// Isolated mapposter environment in a temporary directory
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let env = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        env.write_settings(DEAD_URL);
        env
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    pub fn posters_dir(&self) -> PathBuf {
        self.dir.path().join("posters")
    }

    /// Write `config.toml` with `nominatim_url` as geocoder
    pub fn write_settings(&self, nominatim_url: &str) {
        let text = format!(
            r#"[network]
nominatim_url = "{nominatim_url}"
overpass_url = "{DEAD_URL}"
water_polygons_url = "{DEAD_URL}"
timeout_secs = 2
geocode_delay_ms = 0
graph_delay_ms = 0
features_delay_ms = 0
"#
        );
        std::fs::create_dir_all(self.config_dir()).expect("Failed to create config dir");
        std::fs::write(self.config_dir().join("config.toml"), text).expect("Failed to write settings");
    }

    /// Command for the mapposter binary inside this environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mapposter"));
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env("MAPPOSTER_CACHE_DIR", self.cache_dir())
            .env("MAPPOSTER_CONFIG_DIR", self.config_dir())
            .env("MAPPOSTER_DATA_DIR", self.dir.path().join("data"))
            .env("MAPPOSTER_THEMES_DIR", themes_dir())
            .env("MAPPOSTER_FONTS_DIR", self.dir.path().join("fonts"));
        cmd
    }

    /// Run mapposter with `args`
    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute mapposter")
    }

    /// Store a small street network and water layer for `center`
    pub fn seed_map_data(&self, center: GeoPoint, fetch_dist: f64) {
        let cache = FileCache::new(self.cache_dir());
        let (lat, lon) = (center.lat, center.lon);

        let streets = StreetNetwork {
            edges: vec![
                RoadEdge {
                    highway: Some("primary".to_string()),
                    line: line_string![(x: lon - 0.01, y: lat), (x: lon + 0.01, y: lat)],
                },
                RoadEdge {
                    highway: Some("residential".to_string()),
                    line: line_string![(x: lon, y: lat - 0.01), (x: lon, y: lat + 0.01)],
                },
            ],
        };
        cache
            .set(&graph_cache_key(center, fetch_dist), &streets)
            .expect("Failed to seed street network");

        let water = layers::find("water").expect("water layer");
        let LayerKind::Features(filter) = &water.kind else {
            panic!("water is a feature layer");
        };
        let lake = Feature::new(Geometry::Polygon(polygon![
            (x: lon + 0.002, y: lat + 0.002),
            (x: lon + 0.006, y: lat + 0.002),
            (x: lon + 0.006, y: lat + 0.005),
            (x: lon + 0.002, y: lat + 0.005),
        ]))
        .with_tag("natural", "water");
        cache
            .set(&features_cache_key(water, filter, center, fetch_dist), &vec![lake])
            .expect("Failed to seed water");
    }

    /// Files written below the posters directory
    pub fn posters(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(self.posters_dir())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Themes shipped with the crate
pub fn themes_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("themes")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
