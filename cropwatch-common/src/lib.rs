//! # CropWatch Common Library
//!
//! Shared code for CropWatch services:
//! - Domain model (reports, prone alerts, outbreak clusters)
//! - Grouping-key normalization and coarse spatial cells
//! - Geodesic math for proximity queries
//! - Engine events and the broadcast EventBus
//! - SQLite schema initialization and settings access
//! - Configuration file loading and data directory resolution

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod geo;
pub mod keys;
pub mod model;
pub mod params;

pub use error::{Error, Result};
