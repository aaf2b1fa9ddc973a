//! mapposter - stylized map posters from OpenStreetMap data
//!
//! This library resolves a place to coordinates, fetches street-network and
//! land-use geometry around it, and composes the result into themed
//! SVG, PNG or PDF posters.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Poster logic: layers, geometry, themes, rendering
//! - [`infra`] - Infrastructure layer (network, filesystem cache, datasets)
//! - [`config`] - Constants and service URLs
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
