//! SVG poster composition
//!
//! Everything is drawn in points (72 per inch) with the map window scaled
//! onto the full canvas. Elements carry a z value and are emitted in
//! ascending z order; ties keep their insertion order.

use std::fmt;
use std::fs;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use geo_types::{Coord, Geometry, LineString, Polygon};

use crate::config::defaults;
use crate::core::coordinates::GeoPoint;
use crate::core::export::POINTS_PER_INCH;
use crate::core::fetch::{Feature, LayerData, StreetNetwork};
use crate::core::fonts::Typeface;
use crate::core::geometry::{
    buffer_line, crop_limits, line_scale_factor, parse_width_tag, rects_intersect,
    rotate_geometry, total_bounds, CropLimits, LocalProjection,
};
use crate::core::layers::{self, GeometryClass, LayerSpec, ROADS};
use crate::core::poster_config::{GradientOrientation, Marker};
use crate::core::roads::{normalize_highway, road_style, RoadStyle, ROAD_DEFAULT};
use crate::core::theme::{HexColor, Theme};
use crate::core::typography::{font_scale, layout_text, TextLayout, TextOptions, VerticalAlign};
use crate::error::RenderError;

/// Opacity of line layers
pub const LINE_OPACITY: f64 = 0.7;
/// Width of `<key>_core` highlight lines before scaling
pub const CORE_WIDTH: f64 = 0.2;
/// Paint order of edge fades
pub const FADE_Z: f64 = 10.0;
/// Paint order of the point-of-interest marker
pub const MARKER_Z: f64 = 10.5;
/// Paint order of text
pub const TEXT_Z: f64 = 11.0;

/// Descender depth as a fraction of the font size
const DESCENT: f64 = 0.22;

/// Edge of the poster covered by a fade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl FadeSide {
    fn id(self) -> &'static str {
        match self {
            Self::Top => "fade-top",
            Self::Bottom => "fade-bottom",
            Self::Left => "fade-left",
            Self::Right => "fade-right",
        }
    }

    /// Gradient vector from the edge inward, in bounding box units
    fn vector(self) -> (u8, u8, u8, u8) {
        match self {
            Self::Top => (0, 0, 0, 1),
            Self::Bottom => (0, 1, 0, 0),
            Self::Left => (0, 0, 1, 0),
            Self::Right => (1, 0, 0, 0),
        }
    }
}

/// Sides faded for an orientation
pub fn fade_sides(orientation: GradientOrientation) -> Vec<FadeSide> {
    match orientation {
        GradientOrientation::Vertical => vec![FadeSide::Bottom, FadeSide::Top],
        GradientOrientation::Horizontal => vec![FadeSide::Left, FadeSide::Right],
        GradientOrientation::Both => vec![FadeSide::Bottom, FadeSide::Top, FadeSide::Left, FadeSide::Right],
    }
}

/// Edge fade into the gradient color
#[derive(Debug, Clone, PartialEq)]
pub struct Fade {
    pub sides: Vec<FadeSide>,
    /// Depth as a fraction of the poster side
    pub fraction: f64,
}

impl Default for Fade {
    fn default() -> Self {
        Self {
            sides: fade_sides(GradientOrientation::Vertical),
            fraction: defaults::DEFAULT_FADE_FRACTION,
        }
    }
}

/// Presentation settings for one poster
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    /// Counter-clockwise map rotation in degrees
    pub rotation_deg: f64,
    /// Layers to paint
    pub layers: Vec<String>,
    /// Highway values to draw; `None` draws every road
    pub road_filter: Option<Vec<String>>,
    pub fade: Option<Fade>,
    pub text: TextOptions,
    pub marker: Option<Marker>,
}

impl RenderSettings {
    pub fn new(width_in: f64, height_in: f64, dpi: u32) -> Self {
        Self {
            width_in,
            height_in,
            dpi,
            rotation_deg: 0.0,
            layers: layers::default_enabled().into_iter().map(String::from).collect(),
            road_filter: None,
            fade: Some(Fade::default()),
            text: TextOptions::default(),
            marker: None,
        }
    }

    fn is_enabled(&self, layer: &str) -> bool {
        self.layers.iter().any(|l| l == layer)
    }
}

/// What to draw
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub data: &'a LayerData,
    pub theme: &'a Theme,
    pub typeface: &'a Typeface,
    pub center: GeoPoint,
    /// Map radius in meters, already compensated for cropping
    pub dist: f64,
    pub city: &'a str,
    pub country: &'a str,
}

/// SVG number: at most two decimals, no trailing zeros
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = (self.0 * 100.0).round() / 100.0;
        if !v.is_finite() || v == 0.0 {
            return f.write_str("0");
        }
        write!(f, "{v}")
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `fill="#rrggbb"` style color plus an opacity multiplier
fn paint(color: &str, opacity: f64) -> (String, f64) {
    match HexColor::parse(color) {
        Some(c) => (c.to_rgb_hex(), c.opacity() * opacity),
        None => (escape_xml(color), opacity),
    }
}

fn opacity_attr(name: &str, opacity: f64) -> String {
    if opacity >= 1.0 {
        String::new()
    } else {
        format!(r#" {name}="{}""#, Num(opacity))
    }
}

/// Projection from WGS84 to canvas points
struct MapTransform {
    projection: LocalProjection,
    rotation_deg: f64,
    crop: CropLimits,
    width: f64,
    height: f64,
}

impl MapTransform {
    fn new(center: GeoPoint, dist: f64, settings: &RenderSettings) -> Self {
        let projection = LocalProjection::new(center);
        Self {
            crop: crop_limits(projection.origin(), settings.width_in, settings.height_in, dist),
            projection,
            rotation_deg: settings.rotation_deg,
            width: settings.width_in * POINTS_PER_INCH,
            height: settings.height_in * POINTS_PER_INCH,
        }
    }

    /// Projected and rotated geometry in meters, `None` if off the map
    fn geometry(&self, geom: &Geometry<f64>) -> Option<Geometry<f64>> {
        let projected = self.projection.project_geometry(geom);
        let rotated = rotate_geometry(&projected, self.projection.origin(), self.rotation_deg);
        let bounds = total_bounds(std::iter::once(&rotated))?;
        rects_intersect(&bounds, &self.crop.to_rect()).then_some(rotated)
    }

    fn point(&self, p: GeoPoint) -> Coord<f64> {
        let projected = Geometry::Point(self.projection.project_point(p).into());
        match rotate_geometry(&projected, self.projection.origin(), self.rotation_deg) {
            Geometry::Point(p) => self.to_canvas(p.0),
            _ => self.to_canvas(self.projection.origin()),
        }
    }

    fn to_canvas(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.crop.min_x) / self.crop.width() * self.width,
            y: (self.crop.max_y - c.y) / self.crop.height() * self.height,
        }
    }
}

/// SVG path data accumulated from many geometries
#[derive(Default)]
struct PathData(String);

impl PathData {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn coords(&mut self, t: &MapTransform, coords: &[Coord<f64>], close: bool) {
        if coords.len() < 2 {
            return;
        }
        for (i, c) in coords.iter().enumerate() {
            let p = t.to_canvas(*c);
            let cmd = if i == 0 { 'M' } else { 'L' };
            self.0.push_str(&format!("{cmd}{} {}", Num(p.x), Num(p.y)));
        }
        if close {
            self.0.push('Z');
        }
    }

    /// Ring with a fixed winding: counter-clockwise rings add coverage under
    /// nonzero fill, clockwise rings cut it
    fn ring(&mut self, t: &MapTransform, ring: &LineString<f64>, ccw: bool) {
        if (signed_area(&ring.0) < 0.0) == ccw {
            let reversed: Vec<Coord<f64>> = ring.0.iter().rev().copied().collect();
            self.coords(t, &reversed, true);
        } else {
            self.coords(t, &ring.0, true);
        }
    }

    fn polygon(&mut self, t: &MapTransform, polygon: &Polygon<f64>) {
        self.ring(t, polygon.exterior(), true);
        for ring in polygon.interiors() {
            self.ring(t, ring, false);
        }
    }

    fn polygons(&mut self, t: &MapTransform, geom: &Geometry<f64>) {
        match geom {
            Geometry::Polygon(p) => self.polygon(t, p),
            Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| self.polygon(t, p)),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.polygons(t, g)),
            _ => {}
        }
    }

    fn lines(&mut self, t: &MapTransform, geom: &Geometry<f64>) {
        match geom {
            Geometry::Line(l) => self.coords(t, &[l.start, l.end], false),
            Geometry::LineString(ls) => self.coords(t, &ls.0, false),
            Geometry::MultiLineString(ml) => ml.0.iter().for_each(|ls| self.coords(t, &ls.0, false)),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| self.lines(t, g)),
            _ => {}
        }
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn signed_area(ring: &[Coord<f64>]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

fn line_strings(geom: &Geometry<f64>) -> Vec<&LineString<f64>> {
    match geom {
        Geometry::LineString(ls) => vec![ls],
        Geometry::MultiLineString(ml) => ml.0.iter().collect(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(line_strings).collect(),
        _ => Vec::new(),
    }
}

fn fill_element(d: &PathData, color: &str, opacity: f64, fill_rule: &str) -> String {
    let (fill, opacity) = paint(color, opacity);
    format!(
        r#"<path d="{d}" fill="{fill}"{} fill-rule="{fill_rule}"/>"#,
        opacity_attr("fill-opacity", opacity)
    )
}

fn stroke_element(d: &PathData, color: &str, width: f64, opacity: f64) -> String {
    let (stroke, opacity) = paint(color, opacity);
    format!(
        r#"<path d="{d}" fill="none" stroke="{stroke}" stroke-width="{}"{} stroke-linecap="round" stroke-linejoin="round"/>"#,
        Num(width),
        opacity_attr("stroke-opacity", opacity)
    )
}

/// An element with its paint order
struct Drawable {
    z: f64,
    svg: String,
}

struct Composer<'a> {
    transform: MapTransform,
    theme: &'a Theme,
    scale: f64,
    drawables: Vec<Drawable>,
    defs: String,
}

impl Composer<'_> {
    fn push(&mut self, z: f64, svg: String) {
        self.drawables.push(Drawable { z, svg });
    }

    fn layer(&mut self, layer: &LayerSpec, features: &[Feature]) {
        let fallback = layer.fallback_key.unwrap_or(layer.color_key);
        let color = self.theme.color_or(layer.color_key, fallback).to_string();

        match layer.class {
            GeometryClass::Polygons => {
                let mut d = PathData::default();
                for feature in features {
                    if let Some(geom) = self.transform.geometry(&feature.geometry) {
                        d.polygons(&self.transform, &geom);
                    }
                }
                if !d.is_empty() {
                    self.push(layer.z_order, fill_element(&d, &color, 1.0, "nonzero"));
                }
            }
            GeometryClass::Lines { width } => self.line_layer(layer, features, &color, width),
        }
    }

    fn line_layer(&mut self, layer: &LayerSpec, features: &[Feature], color: &str, width: f64) {
        let mut lines = PathData::default();
        let mut buffered = PathData::default();

        for feature in features {
            let Some(geom) = self.transform.geometry(&feature.geometry) else {
                continue;
            };
            let meters = layer
                .buffer_by_width
                .then(|| feature.tag("width").and_then(parse_width_tag))
                .flatten();
            match meters {
                Some(w) => {
                    for ls in line_strings(&geom) {
                        for part in &buffer_line(ls, w / 2.0).0 {
                            buffered.ring(&self.transform, part.exterior(), true);
                        }
                    }
                }
                None => lines.lines(&self.transform, &geom),
            }
        }

        if !buffered.is_empty() {
            self.push(layer.z_order, fill_element(&buffered, color, LINE_OPACITY, "nonzero"));
        }
        if lines.is_empty() {
            return;
        }

        self.push(
            layer.z_order,
            stroke_element(&lines, color, width * self.scale, LINE_OPACITY),
        );
        let core_key = format!("{}_core", layer.style_key);
        if let Some(core) = self.theme.color(&core_key) {
            self.push(
                layer.z_order + 0.1,
                stroke_element(&lines, core, CORE_WIDTH * self.scale, LINE_OPACITY),
            );
        }
    }

    fn roads(&mut self, z: f64, network: &StreetNetwork, filter: Option<&[String]>) {
        let mut edges: Vec<(RoadStyle, &LineString<f64>)> = network
            .edges
            .iter()
            .filter_map(|edge| {
                let highway = normalize_highway(edge.highway.as_deref());
                if filter.is_some_and(|f| !f.iter().any(|h| h == highway)) {
                    return None;
                }
                Some((road_style(highway), &edge.line))
            })
            .collect();
        edges.sort_by_key(|(style, _)| style.order);

        let mut groups: Vec<(RoadStyle, PathData)> = Vec::new();
        for (style, line) in edges {
            let Some(geom) = self.transform.geometry(&Geometry::LineString(line.clone())) else {
                continue;
            };
            if !groups.last().is_some_and(|(last, _)| *last == style) {
                groups.push((style, PathData::default()));
            }
            if let Some((_, d)) = groups.last_mut() {
                d.lines(&self.transform, &geom);
            }
        }

        for (style, d) in groups {
            let color = self.theme.color_or(style.color_key, ROAD_DEFAULT).to_string();
            self.push(z, stroke_element(&d, &color, style.width * self.scale, 1.0));
        }
    }

    fn fades(&mut self, fade: &Fade) {
        let color = self.theme.color_or("gradient_color", "bg");
        let (stop, opacity) = paint(color, 1.0);
        let (w, h) = (self.transform.width, self.transform.height);
        let f = fade.fraction.clamp(0.0, 0.5);
        if f <= 0.0 {
            return;
        }

        for &side in &fade.sides {
            let (x1, y1, x2, y2) = side.vector();
            self.defs.push_str(&format!(
                r#"<linearGradient id="{id}" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}"><stop offset="0" stop-color="{stop}" stop-opacity="{o}"/><stop offset="1" stop-color="{stop}" stop-opacity="0"/></linearGradient>"#,
                id = side.id(),
                o = Num(opacity),
            ));
            let (x, y, rw, rh) = match side {
                FadeSide::Top => (0.0, 0.0, w, h * f),
                FadeSide::Bottom => (0.0, h * (1.0 - f), w, h * f),
                FadeSide::Left => (0.0, 0.0, w * f, h),
                FadeSide::Right => (w * (1.0 - f), 0.0, w * f, h),
            };
            self.push(
                FADE_Z,
                format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#{})"/>"#,
                    Num(x),
                    Num(y),
                    Num(rw),
                    Num(rh),
                    side.id()
                ),
            );
        }
    }

    fn marker(&mut self, marker: &Marker) -> Result<(), RenderError> {
        let c = self.transform.point(marker.point);
        let size = marker.size;

        let svg = match &marker.svg_path {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| RenderError::Marker {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
                format!(
                    r#"<image x="{}" y="{}" width="{s}" height="{s}" xlink:href="data:image/svg+xml;base64,{}"/>"#,
                    Num(c.x - size / 2.0),
                    Num(c.y - size / 2.0),
                    BASE64.encode(bytes),
                    s = Num(size),
                )
            }
            None => {
                let (fill, opacity) = paint(&marker.color, 1.0);
                format!(
                    r#"<circle cx="{}" cy="{}" r="{}" fill="{fill}"{}/>"#,
                    Num(c.x),
                    Num(c.y),
                    Num(size / 2.0),
                    opacity_attr("fill-opacity", opacity)
                )
            }
        };
        self.push(MARKER_Z, svg);
        Ok(())
    }

    fn text(&mut self, layout: &TextLayout, typeface: &Typeface) {
        let (w, h) = (self.transform.width, self.transform.height);
        let color = self.theme.color_or("text", "road_default").to_string();

        for item in &layout.items {
            let (fill, opacity) = paint(&color, item.opacity);
            let face = typeface.face(item.weight);
            let mut y = (1.0 - item.y) * h;
            if item.align == VerticalAlign::Bottom {
                y -= item.size * DESCENT;
            }
            self.push(
                TEXT_Z,
                format!(
                    r#"<text x="{}" y="{}" font-family="{}" font-weight="{}" font-size="{}" text-anchor="{}" fill="{fill}"{}>{}</text>"#,
                    Num(item.x * w),
                    Num(y),
                    escape_xml(&face.css_family()),
                    face.weight,
                    Num(item.size),
                    item.anchor.as_svg(),
                    opacity_attr("fill-opacity", opacity),
                    escape_xml(&item.text)
                ),
            );
        }

        if let Some(line) = layout.separator {
            let (stroke, opacity) = paint(&color, 1.0);
            let y = (1.0 - line.y) * h;
            self.push(
                TEXT_Z,
                format!(
                    r#"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="{stroke}" stroke-width="{}"{}/>"#,
                    Num(line.x_start * w),
                    Num(line.x_end * w),
                    Num(line.width),
                    opacity_attr("stroke-opacity", opacity),
                    y = Num(y),
                ),
            );
        }
    }

    fn finish(mut self) -> String {
        let (w, h) = (self.transform.width, self.transform.height);
        let (bg, bg_opacity) = paint(self.theme.color_or("bg", "bg"), 1.0);
        self.drawables.sort_by(|a, b| a.z.total_cmp(&b.z));

        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = Num(w),
            h = Num(h),
        );
        if !self.defs.is_empty() {
            out.push_str(&format!("<defs>{}</defs>", self.defs));
        }
        out.push_str(&format!(
            r#"<rect width="100%" height="100%" fill="{bg}"{}/>"#,
            opacity_attr("fill-opacity", bg_opacity)
        ));
        for d in &self.drawables {
            out.push_str(&d.svg);
        }
        out.push_str("</svg>");
        out
    }
}

/// Compose the poster as an SVG document
pub fn render_svg(scene: &Scene<'_>, settings: &RenderSettings) -> Result<String, RenderError> {
    if !(settings.width_in > 0.0 && settings.height_in > 0.0) {
        return Err(RenderError::Svg(format!(
            "invalid poster size {}x{} in",
            settings.width_in, settings.height_in
        )));
    }

    let transform = MapTransform::new(scene.center, scene.dist, settings);
    let scale = line_scale_factor(&transform.crop, settings.width_in, f64::from(settings.dpi));
    tracing::debug!("Line scale factor {scale:.3}");

    let mut composer = Composer {
        transform,
        theme: scene.theme,
        scale,
        drawables: Vec::new(),
        defs: String::new(),
    };

    for layer in layers::catalog() {
        if !layer.render || !settings.is_enabled(layer.name) {
            continue;
        }
        if layer.name == ROADS {
            if let Some(network) = scene.data.streets() {
                composer.roads(layer.z_order, network, settings.road_filter.as_deref());
            }
            continue;
        }
        composer.layer(layer, scene.data.features(layer.name));
    }

    if let Some(fade) = &settings.fade {
        composer.fades(fade);
    }
    if let Some(marker) = &settings.marker {
        composer.marker(marker)?;
    }

    let layout = layout_text(
        &settings.text,
        scene.city,
        scene.country,
        scene.center,
        font_scale(settings.width_in, settings.height_in),
    );
    composer.text(&layout, scene.typeface);

    Ok(composer.finish())
}
