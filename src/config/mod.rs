//! Configuration constants
//!
//! - [`defaults`] - Default poster and network settings
//! - [`urls`] - Service endpoints

pub mod defaults;
pub mod urls;
