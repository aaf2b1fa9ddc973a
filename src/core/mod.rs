//! Core poster logic
//!
//! Everything that decides what a poster looks like. Network access and the
//! on-disk cache live in [`crate::infra`]; modules here reach them only
//! through [`fetch::MapDataSource`] and the cache handle.
//!
//! # Submodules
//!
//! - [`layers`] - Layer catalog with tag filters and styling metadata
//! - [`resolver`] - Layer dependency resolution and fetch order
//! - [`fetch`] - Cached fetch orchestration
//! - [`geometry`] - Projection, rotation, cropping and line buffering
//! - [`coordinates`] - Coordinate parsing
//! - [`theme`] - Theme loading and validation
//! - [`roads`] - Road hierarchy styles
//! - [`typography`] - Text layout
//! - [`fonts`] - Local font discovery
//! - [`render`] - SVG composition
//! - [`export`] - PNG and PDF output
//! - [`effects`] - Band merging and glow post-processing
//! - [`poster`] - End-to-end generation
//! - [`poster_config`] - Saved poster configurations
//! - [`settings`] - User settings

pub mod coordinates;
pub mod effects;
pub mod export;
pub mod fetch;
pub mod fonts;
pub mod geometry;
pub mod layers;
pub mod poster;
pub mod poster_config;
pub mod render;
pub mod resolver;
pub mod roads;
pub mod settings;
pub mod theme;
pub mod typography;
