//! Geometry post-processing
//!
//! Closed-form helpers that keep the rendered poster consistent across
//! sizes: fetch radius compensation, aspect-ratio cropping, line scaling,
//! rotation, line buffering and rectangle clipping.

use geo_types::{
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};

use crate::config::defaults;
use crate::core::coordinates::GeoPoint;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Meters per degree of latitude used for query boxes
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Segments used to approximate round joins
const ROUND_SEGMENTS: usize = 16;

/// Fetch radius that still covers the poster after cropping and rotation
///
/// The poster crops the fetched square to its aspect ratio; a rotated poster
/// needs the bounding square of the rotated frame.
pub fn compensated_distance(dist: f64, width: f64, height: f64, rotation_deg: f64) -> f64 {
    let long = width.max(height);
    let short = width.min(height);
    let theta = rotation_deg.to_radians();
    dist * (long / short) / 4.0 * (theta.cos().abs() + theta.sin().abs())
}

/// Degree bounding box spanning `dist` meters around `center`
pub fn bbox_around(center: GeoPoint, dist: f64) -> Rect<f64> {
    let lat_offset = dist / METERS_PER_DEGREE;
    let lon_offset = dist / (METERS_PER_DEGREE * center.lat.to_radians().cos());
    Rect::new(
        Coord {
            x: center.lon - lon_offset,
            y: center.lat - lat_offset,
        },
        Coord {
            x: center.lon + lon_offset,
            y: center.lat + lat_offset,
        },
    )
}

/// Equirectangular projection to meters around the poster centre
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    center: GeoPoint,
    cos_lat: f64,
}

impl LocalProjection {
    /// Create a projection with its origin at `center`
    pub fn new(center: GeoPoint) -> Self {
        Self {
            center,
            cos_lat: center.lat.to_radians().cos(),
        }
    }

    /// Projected position of the centre
    pub fn origin(&self) -> Coord<f64> {
        Coord { x: 0.0, y: 0.0 }
    }

    /// Project a `(lon, lat)` coordinate to meters
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: EARTH_RADIUS_M * (c.x - self.center.lon).to_radians() * self.cos_lat,
            y: EARTH_RADIUS_M * (c.y - self.center.lat).to_radians(),
        }
    }

    /// Project a point
    pub fn project_point(&self, p: GeoPoint) -> Coord<f64> {
        self.project(Coord { x: p.lon, y: p.lat })
    }

    /// Project a whole geometry
    pub fn project_geometry(&self, geom: &Geometry<f64>) -> Geometry<f64> {
        map_geometry(geom, &|c| self.project(c))
    }
}

/// Visible window of the map in projected meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropLimits {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl CropLimits {
    /// Horizontal field of view in meters
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical field of view in meters
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// As a rectangle
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// Crop inward to the poster aspect ratio while keeping the radius covered
pub fn crop_limits(center: Coord<f64>, width: f64, height: f64, dist: f64) -> CropLimits {
    let aspect = width / height;
    let (half_x, half_y) = if aspect > 1.0 {
        (dist, dist / aspect)
    } else {
        (dist * aspect, dist)
    };

    CropLimits {
        min_x: center.x - half_x,
        max_x: center.x + half_x,
        min_y: center.y - half_y,
        max_y: center.y + half_y,
    }
}

/// Stroke width multiplier relative to the reference poster
pub fn line_scale_factor(crop: &CropLimits, width_in: f64, dpi: f64) -> f64 {
    let px_per_m = (width_in * dpi) / crop.width();
    px_per_m / defaults::REF_PX_PER_M
}

/// Rotate a geometry counter-clockwise around `origin`
pub fn rotate_geometry(geom: &Geometry<f64>, origin: Coord<f64>, degrees: f64) -> Geometry<f64> {
    if degrees == 0.0 {
        return geom.clone();
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    map_geometry(geom, &|c| {
        let dx = c.x - origin.x;
        let dy = c.y - origin.y;
        Coord {
            x: origin.x + dx * cos - dy * sin,
            y: origin.y + dx * sin + dy * cos,
        }
    })
}

/// Apply `f` to every coordinate
///
/// `Rect` and `Triangle` become polygons since they do not survive
/// arbitrary transforms.
pub fn map_geometry(geom: &Geometry<f64>, f: &dyn Fn(Coord<f64>) -> Coord<f64>) -> Geometry<f64> {
    match geom {
        Geometry::Point(p) => Geometry::Point(Point(f(p.0))),
        Geometry::Line(l) => Geometry::Line(Line::new(f(l.start), f(l.end))),
        Geometry::LineString(ls) => Geometry::LineString(map_line(ls, f)),
        Geometry::Polygon(p) => Geometry::Polygon(map_polygon(p, f)),
        Geometry::MultiPoint(mp) => {
            Geometry::MultiPoint(MultiPoint(mp.0.iter().map(|p| Point(f(p.0))).collect()))
        }
        Geometry::MultiLineString(ml) => Geometry::MultiLineString(MultiLineString(
            ml.0.iter().map(|l| map_line(l, f)).collect(),
        )),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon(
            mp.0.iter().map(|p| map_polygon(p, f)).collect(),
        )),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection(
            gc.0.iter().map(|g| map_geometry(g, f)).collect(),
        )),
        Geometry::Rect(r) => Geometry::Polygon(map_polygon(&r.to_polygon(), f)),
        Geometry::Triangle(t) => Geometry::Polygon(map_polygon(&t.to_polygon(), f)),
    }
}

fn map_line(ls: &LineString<f64>, f: &dyn Fn(Coord<f64>) -> Coord<f64>) -> LineString<f64> {
    LineString(ls.0.iter().map(|c| f(*c)).collect())
}

fn map_polygon(p: &Polygon<f64>, f: &dyn Fn(Coord<f64>) -> Coord<f64>) -> Polygon<f64> {
    Polygon::new(
        map_line(p.exterior(), f),
        p.interiors().iter().map(|r| map_line(r, f)).collect(),
    )
}

/// Visit every coordinate of a geometry
pub fn for_each_coord(geom: &Geometry<f64>, f: &mut dyn FnMut(Coord<f64>)) {
    match geom {
        Geometry::Point(p) => f(p.0),
        Geometry::Line(l) => {
            f(l.start);
            f(l.end);
        }
        Geometry::LineString(ls) => ls.0.iter().for_each(|c| f(*c)),
        Geometry::Polygon(p) => {
            p.exterior().0.iter().for_each(|c| f(*c));
            for ring in p.interiors() {
                ring.0.iter().for_each(|c| f(*c));
            }
        }
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
        Geometry::MultiLineString(ml) => ml.0.iter().flat_map(|l| l.0.iter()).for_each(|c| f(*c)),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                p.exterior().0.iter().for_each(|c| f(*c));
                for ring in p.interiors() {
                    ring.0.iter().for_each(|c| f(*c));
                }
            }
        }
        Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| for_each_coord(g, f)),
        Geometry::Rect(r) => {
            f(r.min());
            f(r.max());
        }
        Geometry::Triangle(t) => t.to_array().iter().for_each(|c| f(*c)),
    }
}

/// Bounding rectangle of a set of geometries
pub fn total_bounds<'a>(geoms: impl IntoIterator<Item = &'a Geometry<f64>>) -> Option<Rect<f64>> {
    let mut bounds: Option<(Coord<f64>, Coord<f64>)> = None;
    for geom in geoms {
        for_each_coord(geom, &mut |c| {
            bounds = Some(match bounds {
                None => (c, c),
                Some((lo, hi)) => (
                    Coord {
                        x: lo.x.min(c.x),
                        y: lo.y.min(c.y),
                    },
                    Coord {
                        x: hi.x.max(c.x),
                        y: hi.y.max(c.y),
                    },
                ),
            });
        });
    }
    bounds.map(|(lo, hi)| Rect::new(lo, hi))
}

/// Smallest rectangle containing both
pub fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Whether two rectangles overlap (touching counts)
pub fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Approximate the outline of a line stroked with `half_width`
///
/// Returns one quad per segment plus a disc at every vertex, which together
/// cover the buffered area with round joins and caps. Filled with the same
/// color they render as the union.
pub fn buffer_line(line: &LineString<f64>, half_width: f64) -> MultiPolygon<f64> {
    if half_width <= 0.0 || line.0.len() < 2 {
        return MultiPolygon(Vec::new());
    }

    let mut parts = Vec::new();
    for w in line.0.windows(2) {
        let (a, b) = (w[0], w[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = dx.hypot(dy);
        if len == 0.0 {
            continue;
        }
        let nx = -dy / len * half_width;
        let ny = dx / len * half_width;
        parts.push(Polygon::new(
            LineString(vec![
                Coord { x: a.x + nx, y: a.y + ny },
                Coord { x: b.x + nx, y: b.y + ny },
                Coord { x: b.x - nx, y: b.y - ny },
                Coord { x: a.x - nx, y: a.y - ny },
            ]),
            Vec::new(),
        ));
    }

    for c in &line.0 {
        parts.push(disc(*c, half_width));
    }

    MultiPolygon(parts)
}

fn disc(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring = (0..ROUND_SEGMENTS)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / ROUND_SEGMENTS as f64;
            Coord {
                x: center.x + radius * a.cos(),
                y: center.y + radius * a.sin(),
            }
        })
        .collect();
    Polygon::new(LineString(ring), Vec::new())
}

/// Parse an OSM `width` tag into meters
///
/// Accepts `12`, `12 m`, `3,5`, `40 ft` and `40'`. Returns `None` for
/// anything unparseable or non-positive.
pub fn parse_width_tag(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.replace(',', ".").parse().ok()?;

    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "m" => 1.0,
        "km" => 1000.0,
        "ft" | "'" => 0.3048,
        _ => return None,
    };

    let meters = number * factor;
    (meters.is_finite() && meters > 0.0).then_some(meters)
}

/// Clip a ring to a rectangle (Sutherland–Hodgman)
///
/// The input may be open or closed; the output is open.
pub fn clip_ring_to_rect(ring: &[Coord<f64>], rect: &Rect<f64>) -> Vec<Coord<f64>> {
    let mut points: Vec<Coord<f64>> = ring.to_vec();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let (min, max) = (rect.min(), rect.max());
    let edges: [(fn(Coord<f64>, f64) -> bool, fn(Coord<f64>, Coord<f64>, f64) -> Coord<f64>, f64); 4] = [
        (|c, v| c.x >= v, intersect_x, min.x),
        (|c, v| c.x <= v, intersect_x, max.x),
        (|c, v| c.y >= v, intersect_y, min.y),
        (|c, v| c.y <= v, intersect_y, max.y),
    ];

    for (inside, intersect, value) in edges {
        if points.is_empty() {
            break;
        }
        let input = std::mem::take(&mut points);
        let mut prev = input[input.len() - 1];
        for &curr in &input {
            let curr_in = inside(curr, value);
            let prev_in = inside(prev, value);
            if curr_in {
                if !prev_in {
                    points.push(intersect(prev, curr, value));
                }
                points.push(curr);
            } else if prev_in {
                points.push(intersect(prev, curr, value));
            }
            prev = curr;
        }
    }

    points
}

fn intersect_x(a: Coord<f64>, b: Coord<f64>, x: f64) -> Coord<f64> {
    let t = (x - a.x) / (b.x - a.x);
    Coord {
        x,
        y: a.y + t * (b.y - a.y),
    }
}

fn intersect_y(a: Coord<f64>, b: Coord<f64>, y: f64) -> Coord<f64> {
    let t = (y - a.y) / (b.y - a.y);
    Coord {
        x: a.x + t * (b.x - a.x),
        y,
    }
}

/// Clip a polygon to a rectangle, dropping it if nothing remains
pub fn clip_polygon_to_rect(polygon: &Polygon<f64>, rect: &Rect<f64>) -> Option<Polygon<f64>> {
    let exterior = clip_ring_to_rect(&polygon.exterior().0, rect);
    if exterior.len() < 3 {
        return None;
    }

    let interiors = polygon
        .interiors()
        .iter()
        .map(|r| clip_ring_to_rect(&r.0, rect))
        .filter(|r| r.len() >= 3)
        .map(LineString)
        .collect();

    Some(Polygon::new(LineString(exterior), interiors))
}

/// Even-odd point in ring test
pub fn ring_contains_point(ring: &[Coord<f64>], p: Coord<f64>) -> bool {
    let mut inside = false;
    let Some(mut prev) = ring.last().copied() else {
        return false;
    };
    for &curr in ring {
        if (curr.y > p.y) != (prev.y > p.y)
            && p.x < (prev.x - curr.x) * (p.y - curr.y) / (prev.y - curr.y) + curr.x
        {
            inside = !inside;
        }
        prev = curr;
    }
    inside
}

/// Build polygons from outer and inner rings
///
/// Each inner ring becomes a hole of the first outer ring containing its
/// first vertex; orphaned inner rings are dropped.
pub fn polygons_from_rings(outers: Vec<Vec<Coord<f64>>>, inners: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outers.len()];
    for inner in inners {
        let Some(&first) = inner.first() else {
            continue;
        };
        if let Some(i) = outers.iter().position(|o| ring_contains_point(o, first)) {
            holes[i].push(LineString(inner));
        }
    }

    outers
        .into_iter()
        .zip(holes)
        .map(|(outer, holes)| Polygon::new(LineString(outer), holes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{distance, polyline, poster_side};
    use proptest::prelude::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_compensated_distance_portrait() {
        let d = compensated_distance(29_000.0, 12.0, 16.0, 0.0);
        assert!(close(d, 29_000.0 * 16.0 / 12.0 / 4.0, 1e-9));
    }

    #[test]
    fn test_compensated_distance_is_orientation_independent() {
        let portrait = compensated_distance(10_000.0, 12.0, 16.0, 0.0);
        let landscape = compensated_distance(10_000.0, 16.0, 12.0, 0.0);
        assert!(close(portrait, landscape, 1e-9));
    }

    #[test]
    fn test_compensated_distance_grows_with_rotation() {
        let straight = compensated_distance(10_000.0, 12.0, 12.0, 0.0);
        let rotated = compensated_distance(10_000.0, 12.0, 12.0, 45.0);
        assert!(close(rotated / straight, 2f64.sqrt(), 1e-9));
        let quarter = compensated_distance(10_000.0, 12.0, 12.0, 90.0);
        assert!(close(quarter, straight, 1e-9));
    }

    #[test]
    fn test_crop_limits_portrait_shrinks_width() {
        let crop = crop_limits(Coord { x: 0.0, y: 0.0 }, 12.0, 16.0, 1000.0);
        assert!(close(crop.width(), 1500.0, 1e-9));
        assert!(close(crop.height(), 2000.0, 1e-9));
    }

    #[test]
    fn test_crop_limits_landscape_shrinks_height() {
        let crop = crop_limits(Coord { x: 10.0, y: 20.0 }, 16.0, 12.0, 1000.0);
        assert!(close(crop.width(), 2000.0, 1e-9));
        assert!(close(crop.height(), 1500.0, 1e-9));
        assert!(close((crop.min_x + crop.max_x) / 2.0, 10.0, 1e-9));
        assert!(close((crop.min_y + crop.max_y) / 2.0, 20.0, 1e-9));
    }

    #[test]
    fn test_line_scale_reference_poster_is_one() {
        let half = defaults::REF_FOV_X / 2.0;
        let crop = CropLimits {
            min_x: -half,
            max_x: half,
            min_y: -half,
            max_y: half,
        };
        let scale = line_scale_factor(&crop, defaults::REF_WIDTH_IN, defaults::REF_DPI);
        assert!(close(scale, 1.0, 1e-3));
    }

    #[test]
    fn test_projection_origin_and_scale() {
        let proj = LocalProjection::new(GeoPoint::new(0.0, 0.0));
        let origin = proj.project_point(GeoPoint::new(0.0, 0.0));
        assert!(close(origin.x, 0.0, 1e-9) && close(origin.y, 0.0, 1e-9));

        let north = proj.project_point(GeoPoint::new(1.0, 0.0));
        assert!(close(north.y, EARTH_RADIUS_M * 1f64.to_radians(), 1e-6));
    }

    #[test]
    fn test_projection_shrinks_longitude_with_latitude() {
        let equator = LocalProjection::new(GeoPoint::new(0.0, 0.0));
        let north = LocalProjection::new(GeoPoint::new(60.0, 0.0));
        let e = equator.project(Coord { x: 1.0, y: 0.0 });
        let n = north.project(Coord { x: 1.0, y: 60.0 });
        assert!(close(n.x / e.x, 0.5, 1e-9));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let geom = Geometry::Point(Point::new(1.0, 0.0));
        let Geometry::Point(p) = rotate_geometry(&geom, Coord { x: 0.0, y: 0.0 }, 90.0) else {
            panic!("rotation keeps geometry type");
        };
        assert!(close(p.x(), 0.0, 1e-12));
        assert!(close(p.y(), 1.0, 1e-12));
    }

    #[test]
    fn test_bbox_around_equator() {
        let bbox = bbox_around(GeoPoint::new(0.0, 0.0), 111_000.0);
        assert!(close(bbox.min().y, -1.0, 1e-9));
        assert!(close(bbox.max().x, 1.0, 1e-9));
    }

    #[test]
    fn test_buffer_line_parts() {
        let line = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let buffered = buffer_line(&line, 2.0);
        // two segment quads and three joins
        assert_eq!(buffered.0.len(), 5);

        let quad = &buffered.0[0];
        let ys: Vec<f64> = quad.exterior().0.iter().map(|c| c.y).collect();
        assert!(ys.iter().all(|y| close(y.abs(), 2.0, 1e-9)));
    }

    #[test]
    fn test_buffer_line_degenerate() {
        let line = LineString::from(vec![(0.0, 0.0)]);
        assert!(buffer_line(&line, 2.0).0.is_empty());
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]);
        assert!(buffer_line(&line, 0.0).0.is_empty());
    }

    #[test]
    fn test_parse_width_tag() {
        assert_eq!(parse_width_tag("12"), Some(12.0));
        assert_eq!(parse_width_tag("12 m"), Some(12.0));
        assert_eq!(parse_width_tag("3,5"), Some(3.5));
        assert!(close(parse_width_tag("10 ft").unwrap(), 3.048, 1e-9));
        assert_eq!(parse_width_tag("wide"), None);
        assert_eq!(parse_width_tag("0"), None);
        assert_eq!(parse_width_tag("5 furlongs"), None);
    }

    #[test]
    fn test_clip_polygon_inside_unchanged() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let poly = Polygon::new(
            LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]),
            vec![],
        );
        let clipped = clip_polygon_to_rect(&poly, &rect).unwrap();
        assert_eq!(clipped.exterior().0.len(), 5);
    }

    #[test]
    fn test_clip_polygon_overlapping() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let poly = Polygon::new(
            LineString::from(vec![(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)]),
            vec![],
        );
        let clipped = clip_polygon_to_rect(&poly, &rect).unwrap();
        for c in &clipped.exterior().0 {
            assert!((0.0..=5.0).contains(&c.x) && (0.0..=5.0).contains(&c.y));
        }
    }

    #[test]
    fn test_clip_polygon_outside_is_dropped() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let poly = Polygon::new(
            LineString::from(vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0)]),
            vec![],
        );
        assert!(clip_polygon_to_rect(&poly, &rect).is_none());
    }

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0 + side, y: y0 },
            Coord { x: x0 + side, y: y0 + side },
            Coord { x: x0, y: y0 + side },
            Coord { x: x0, y: y0 },
        ]
    }

    #[test]
    fn test_ring_contains_point() {
        let ring = square(0.0, 0.0, 10.0);
        assert!(ring_contains_point(&ring, Coord { x: 5.0, y: 5.0 }));
        assert!(!ring_contains_point(&ring, Coord { x: 15.0, y: 5.0 }));
        assert!(!ring_contains_point(&[], Coord { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn test_polygons_from_rings_assigns_holes() {
        let outers = vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)];
        let inners = vec![square(22.0, 2.0, 1.0), square(100.0, 100.0, 1.0)];
        let polygons = polygons_from_rings(outers, inners);
        assert_eq!(polygons.len(), 2);
        assert!(polygons[0].interiors().is_empty());
        assert_eq!(polygons[1].interiors().len(), 1);
    }

    #[test]
    fn test_total_bounds_and_union() {
        let geoms = vec![
            Geometry::Point(Point::new(1.0, 2.0)),
            Geometry::LineString(LineString::from(vec![(-1.0, 0.0), (3.0, 5.0)])),
        ];
        let bounds = total_bounds(&geoms).unwrap();
        assert_eq!(bounds.min(), Coord { x: -1.0, y: 0.0 });
        assert_eq!(bounds.max(), Coord { x: 3.0, y: 5.0 });

        let other = Rect::new(Coord { x: -2.0, y: 1.0 }, Coord { x: 0.0, y: 9.0 });
        let u = union_rect(bounds, other);
        assert_eq!(u.min(), Coord { x: -2.0, y: 0.0 });
        assert_eq!(u.max(), Coord { x: 3.0, y: 9.0 });
        assert!(total_bounds(std::iter::empty()).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The crop window always has the poster's aspect ratio and fits the radius
        #[test]
        fn prop_crop_matches_aspect(w in poster_side(), h in poster_side(), d in distance()) {
            let crop = crop_limits(Coord { x: 0.0, y: 0.0 }, w, h, d);
            prop_assert!(close(crop.width() / crop.height(), w / h, 1e-9));
            prop_assert!(crop.width() <= 2.0 * d + 1e-6);
            prop_assert!(crop.height() <= 2.0 * d + 1e-6);
        }

        /// Rotating forth and back is the identity
        #[test]
        fn prop_rotation_roundtrip(pts in polyline(), deg in -180.0f64..180.0) {
            let geom = Geometry::LineString(LineString::from(pts.clone()));
            let origin = Coord { x: 3.0, y: -7.0 };
            let back = rotate_geometry(&rotate_geometry(&geom, origin, deg), origin, -deg);
            let Geometry::LineString(ls) = back else { unreachable!() };
            for (c, (x, y)) in ls.0.iter().zip(pts) {
                prop_assert!(close(c.x, x, 1e-6) && close(c.y, y, 1e-6));
            }
        }

        /// Line scaling is proportional to physical width times DPI
        #[test]
        fn prop_line_scale_proportional(w in poster_side(), d in distance()) {
            let crop = crop_limits(Coord { x: 0.0, y: 0.0 }, w, w, d);
            let a = line_scale_factor(&crop, w, 300.0);
            let b = line_scale_factor(&crop, w, 150.0);
            prop_assert!(close(a, 2.0 * b, 1e-9));
        }

        /// One quad per segment and one disc per vertex
        #[test]
        fn prop_buffer_line_part_count(pts in polyline(), hw in 0.5f64..50.0) {
            let line = LineString::from(pts.clone());
            let buffered = buffer_line(&line, hw);
            prop_assert_eq!(buffered.0.len(), (pts.len() - 1) + pts.len());
        }

        /// Clipped rings never leave the rectangle
        #[test]
        fn prop_clip_stays_inside(pts in polyline()) {
            let rect = Rect::new(Coord { x: -300.0, y: -300.0 }, Coord { x: 300.0, y: 300.0 });
            let ring: Vec<Coord<f64>> = pts.iter().map(|&(x, y)| Coord { x, y }).collect();
            for c in clip_ring_to_rect(&ring, &rect) {
                prop_assert!(c.x >= -300.0 - 1e-6 && c.x <= 300.0 + 1e-6);
                prop_assert!(c.y >= -300.0 - 1e-6 && c.y <= 300.0 + 1e-6);
            }
        }
    }
}
