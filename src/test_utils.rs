//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    use crate::core::coordinates::GeoPoint;
    use crate::core::layers;

    /// Generate a valid latitude, avoiding the poles
    pub fn latitude() -> impl Strategy<Value = f64> {
        -85.0f64..85.0
    }

    /// Generate a valid longitude
    pub fn longitude() -> impl Strategy<Value = f64> {
        -180.0f64..180.0
    }

    /// Generate a poster centre
    pub fn geo_point() -> impl Strategy<Value = GeoPoint> {
        (latitude(), longitude()).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
    }

    /// Generate a city name in Latin script
    pub fn city_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,14}( [A-Z][a-z]{1,10})?"
    }

    /// Generate a poster side length in inches
    pub fn poster_side() -> impl Strategy<Value = f64> {
        2.0f64..48.0
    }

    /// Generate a map radius in meters
    pub fn distance() -> impl Strategy<Value = f64> {
        500.0f64..60_000.0
    }

    /// Generate a subset of catalog layer names, in arbitrary order
    pub fn layer_subset() -> impl Strategy<Value = Vec<String>> {
        let names: Vec<String> = layers::catalog()
            .iter()
            .map(|l| l.name.to_string())
            .collect();
        proptest::sample::subsequence(names.clone(), 0..=names.len())
            .prop_shuffle()
    }

    /// Generate a polyline in local meters with at least two distinct points
    pub fn polyline() -> impl Strategy<Value = Vec<(f64, f64)>> {
        proptest::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 2..8).prop_filter(
            "segments must have length",
            |pts| pts.windows(2).all(|w| (w[0].0 - w[1].0).hypot(w[0].1 - w[1].1) > 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_geo_point_generator(point in geo_point()) {
            prop_assert!(point.is_valid());
        }

        #[test]
        fn test_city_name_generator(name in city_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_alphabetic() || c == ' '));
        }

        #[test]
        fn test_layer_subset_generator(names in layer_subset()) {
            let mut unique = names.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), names.len());
        }
    }
}
