//! Ocean polygons from the OSM water polygon dataset
//!
//! The split WGS84 shapefile is downloaded once into the data directory and
//! clipped to the requested bounding box on every use.

use std::path::{Path, PathBuf};

use geo_types::{Coord, Geometry, Polygon, Rect};

use crate::config::urls;
use crate::core::fetch::Feature;
use crate::core::geometry::{clip_polygon_to_rect, polygons_from_rings, rects_intersect, total_bounds};
use crate::error::FetchError;
use crate::infra::dirs::PosterDirs;
use crate::infra::download::{extract_zip_flat, DownloadManager, ProgressCallback};

/// Shapefile name inside the extracted archive
pub const SHAPEFILE_NAME: &str = "water_polygons.shp";

/// Local copy of the water polygon dataset
#[derive(Debug, Clone)]
pub struct WaterPolygons {
    dir: PathBuf,
    url: String,
    downloader: DownloadManager,
}

impl WaterPolygons {
    pub fn new(dir: PathBuf, url: &str) -> Self {
        Self {
            dir,
            url: url.to_string(),
            downloader: DownloadManager::new(),
        }
    }

    /// Dataset in the standard data directory
    pub fn from_dirs(dirs: &PosterDirs) -> Self {
        Self::new(dirs.water_polygons_dir(), urls::WATER_POLYGONS)
    }

    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    #[must_use]
    pub fn with_downloader(mut self, downloader: DownloadManager) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn shapefile_path(&self) -> PathBuf {
        self.dir.join(SHAPEFILE_NAME)
    }

    pub fn is_available(&self) -> bool {
        self.shapefile_path().is_file()
    }

    /// Download and extract the dataset unless it is already present
    pub async fn ensure(&self, progress: Option<ProgressCallback>) -> Result<PathBuf, FetchError> {
        let shapefile = self.shapefile_path();
        if shapefile.is_file() {
            return Ok(shapefile);
        }

        let dataset_err = |error: String| FetchError::WaterPolygons {
            path: self.dir.clone(),
            error,
        };

        let archive = self.dir.with_extension("zip");
        tracing::info!("Downloading water polygons from {}", self.url);
        self.downloader
            .download(&self.url, &archive, progress)
            .await
            .map_err(|e| dataset_err(format!("{e} (manual download: {})", urls::WATER_POLYGONS_INFO)))?;

        let extracted = extract_zip_flat(&archive, &self.dir).map_err(|e| dataset_err(e.to_string()))?;
        tracing::debug!("Extracted {} files to {}", extracted.len(), self.dir.display());

        if let Err(e) = std::fs::remove_file(&archive) {
            tracing::debug!("Could not remove {}: {e}", archive.display());
        }

        if !shapefile.is_file() {
            return Err(dataset_err(format!("archive did not contain {SHAPEFILE_NAME}")));
        }
        Ok(shapefile)
    }

    /// Ocean polygons intersecting `bbox`, clipped to it
    pub fn clip(&self, bbox: &Rect<f64>) -> Result<Vec<Feature>, FetchError> {
        clip_shapefile(&self.shapefile_path(), bbox)
    }
}

/// Read a polygon shapefile and clip every shape to `bbox`
pub fn clip_shapefile(path: &Path, bbox: &Rect<f64>) -> Result<Vec<Feature>, FetchError> {
    let shape_err = |e: shapefile::Error| FetchError::WaterPolygons {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let mut reader = shapefile::ShapeReader::from_path(path).map_err(shape_err)?;
    let mut features = Vec::new();

    for shape in reader.iter_shapes_as::<shapefile::Polygon>() {
        let shape = shape.map_err(shape_err)?;

        let mut outers = Vec::new();
        let mut inners = Vec::new();
        for ring in shape.rings() {
            let coords: Vec<Coord<f64>> = ring
                .points()
                .iter()
                .map(|p| Coord { x: p.x, y: p.y })
                .collect();
            match ring {
                shapefile::PolygonRing::Outer(_) => outers.push(coords),
                shapefile::PolygonRing::Inner(_) => inners.push(coords),
            }
        }

        features.extend(
            clip_rings(outers, inners, bbox)
                .into_iter()
                .map(|p| Feature::new(Geometry::Polygon(p))),
        );
    }

    tracing::debug!("Clipped {} ocean polygons from {}", features.len(), path.display());
    Ok(features)
}

/// Assemble rings into polygons and clip them to `bbox`
pub fn clip_rings(outers: Vec<Vec<Coord<f64>>>, inners: Vec<Vec<Coord<f64>>>, bbox: &Rect<f64>) -> Vec<Polygon<f64>> {
    let outers: Vec<Vec<Coord<f64>>> = outers
        .into_iter()
        .filter(|ring| ring_bounds(ring).is_some_and(|b| rects_intersect(&b, bbox)))
        .collect();
    if outers.is_empty() {
        return Vec::new();
    }

    polygons_from_rings(outers, inners)
        .iter()
        .filter_map(|p| clip_polygon_to_rect(p, bbox))
        .collect()
}

fn ring_bounds(ring: &[Coord<f64>]) -> Option<Rect<f64>> {
    let line = Geometry::LineString(geo_types::LineString(ring.to_vec()));
    total_bounds(std::iter::once(&line))
}
