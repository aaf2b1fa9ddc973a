//! Poster typography
//!
//! Lays out the city name, country, coordinates, separator line and
//! attribution in axes fractions (0..1, origin bottom-left). Font sizes are
//! in points and scale with the smaller poster side.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::config::defaults::{ATTRIBUTION, REF_FONT_SIDE_IN};
use crate::core::coordinates::GeoPoint;
use crate::core::fonts::FontWeight;
use crate::core::poster_config::lenient;

/// Base city name size at the reference side
pub const BASE_MAIN_SIZE: f64 = 60.0;
/// Base country size
pub const BASE_SUB_SIZE: f64 = 22.0;
/// Base coordinates size
pub const BASE_COORDS_SIZE: f64 = 14.0;
/// Attribution size, not scaled
pub const BASE_ATTR_SIZE: f64 = 8.0;

/// City names longer than this shrink
const LONG_NAME_CHARS: usize = 10;

/// A position in axes fractions
///
/// Unset coordinates fall back to the element's default position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    /// Fill unset coordinates from `default`
    pub fn resolve(&self, default: (f64, f64)) -> (f64, f64) {
        (self.x.unwrap_or(default.0), self.y.unwrap_or(default.1))
    }
}

/// Horizontal extent of the separator line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Typography settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub show_city: bool,
    pub show_country: bool,
    pub show_coords: bool,
    pub show_attribution: bool,
    pub show_line: bool,

    /// Font family; empty selects the default family
    pub font_family: String,

    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub main_size: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub sub_size: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub coords_size: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub attr_size: Option<f64>,

    pub city_pos: Position,
    pub country_pos: Position,
    pub coords_pos: Position,
    pub line_x: Span,
    #[serde(deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub line_y: Option<f64>,
    pub attr_pos: Position,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            show_city: true,
            show_country: true,
            show_coords: true,
            show_attribution: true,
            show_line: true,
            font_family: String::new(),
            main_size: None,
            sub_size: None,
            coords_size: None,
            attr_size: None,
            city_pos: Position::default(),
            country_pos: Position::default(),
            coords_pos: Position::default(),
            line_x: Span::default(),
            line_y: None,
            attr_pos: Position::default(),
        }
    }
}

impl TextOptions {
    /// Requested font family, if any
    pub fn font_family(&self) -> Option<&str> {
        Some(self.font_family.trim()).filter(|f| !f.is_empty())
    }

    fn any_text(&self) -> bool {
        self.show_city || self.show_country || self.show_coords
    }
}

/// Horizontal text anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Middle,
    End,
}

impl Anchor {
    /// SVG `text-anchor` value
    pub fn as_svg(self) -> &'static str {
        match self {
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// What the item's `y` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    /// Text baseline
    Baseline,
    /// Bottom of the glyph box
    Bottom,
}

/// One line of text to draw
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Size in points
    pub size: f64,
    pub weight: FontWeight,
    pub opacity: f64,
    pub anchor: Anchor,
    pub align: VerticalAlign,
}

/// Separator line between city and country
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separator {
    pub x_start: f64,
    pub x_end: f64,
    pub y: f64,
    /// Width in points
    pub width: f64,
}

/// All typography of a poster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub items: Vec<TextItem>,
    pub separator: Option<Separator>,
}

/// Font scale for a poster, relative to a 12 inch side
pub fn font_scale(width_in: f64, height_in: f64) -> f64 {
    width_in.min(height_in) / REF_FONT_SIDE_IN
}

/// Whether more than 80% of the letters are Latin
///
/// Text without letters counts as Latin.
pub fn is_latin_script(text: &str) -> bool {
    let (latin, total) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(latin, total), c| {
            (latin + usize::from((c as u32) < 0x250), total + 1)
        });

    total == 0 || latin as f64 / total as f64 > 0.8
}

/// Display form of the city name
///
/// Latin names are uppercased and letter-spaced (`P  A  R  I  S`); other
/// scripts are kept as is.
pub fn space_city_name(city: &str) -> String {
    if !is_latin_script(city) {
        return city.to_string();
    }
    city.to_uppercase()
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("  ")
}

/// City name size in points, shrunk for long names
pub fn main_font_size(city: &str, base: f64, scale: f64) -> f64 {
    let size = base * scale;
    let chars = city.chars().count();
    if chars > LONG_NAME_CHARS {
        (size * LONG_NAME_CHARS as f64 / chars as f64).max(10.0 * scale)
    } else {
        size
    }
}

/// `48.8566° N / 2.3522° E`
pub fn format_coordinates(point: GeoPoint) -> String {
    let ns = if point.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if point.lon >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.4}° {ns} / {:.4}° {ew}",
        point.lat.abs(),
        point.lon.abs()
    )
}

fn escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\\u([0-9a-fA-F]{4})|\\U([0-9a-fA-F]{8})").expect("valid escape pattern")
    })
}

/// Decode literal `\uXXXX` and `\UXXXXXXXX` escapes
///
/// Escapes that do not form a valid character are left untouched.
pub fn decode_unicode_escapes(text: &str) -> String {
    escape_regex()
        .replace_all(text, |caps: &Captures| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Lay out all poster text
pub fn layout_text(
    options: &TextOptions,
    city: &str,
    country: &str,
    point: GeoPoint,
    scale: f64,
) -> TextLayout {
    let city = decode_unicode_escapes(city);
    let country = decode_unicode_escapes(country);
    let mut layout = TextLayout::default();

    if options.show_city {
        let (x, y) = options.city_pos.resolve((0.5, 0.14));
        let base = options.main_size.unwrap_or(BASE_MAIN_SIZE);
        layout.items.push(TextItem {
            text: space_city_name(&city),
            x,
            y,
            size: main_font_size(&city, base, scale),
            weight: FontWeight::Bold,
            opacity: 1.0,
            anchor: Anchor::Middle,
            align: VerticalAlign::Baseline,
        });
    }

    if options.show_country {
        let (x, y) = options.country_pos.resolve((0.5, 0.10));
        layout.items.push(TextItem {
            text: country.to_uppercase(),
            x,
            y,
            size: options.sub_size.unwrap_or(BASE_SUB_SIZE) * scale,
            weight: FontWeight::Light,
            opacity: 1.0,
            anchor: Anchor::Middle,
            align: VerticalAlign::Baseline,
        });
    }

    if options.show_coords {
        let (x, y) = options.coords_pos.resolve((0.5, 0.07));
        layout.items.push(TextItem {
            text: format_coordinates(point),
            x,
            y,
            size: options.coords_size.unwrap_or(BASE_COORDS_SIZE) * scale,
            weight: FontWeight::Regular,
            opacity: 0.7,
            anchor: Anchor::Middle,
            align: VerticalAlign::Baseline,
        });
    }

    if options.show_line && options.any_text() {
        layout.separator = Some(Separator {
            x_start: options.line_x.start.unwrap_or(0.4),
            x_end: options.line_x.end.unwrap_or(0.6),
            y: options.line_y.unwrap_or(0.125),
            width: scale,
        });
    }

    if options.show_attribution {
        let (x, y) = options.attr_pos.resolve((0.98, 0.02));
        layout.items.push(TextItem {
            text: ATTRIBUTION.to_string(),
            x,
            y,
            size: options.attr_size.unwrap_or(BASE_ATTR_SIZE),
            weight: FontWeight::Light,
            opacity: 0.5,
            anchor: Anchor::End,
            align: VerticalAlign::Bottom,
        });
    }

    layout
}
