//! Infrastructure layer
//!
//! Handles all I/O: HTTP services, the file cache, datasets and directories.

pub mod cache;
pub mod dirs;
pub mod download;
pub mod geocoder;
pub mod overpass;
pub mod water;
