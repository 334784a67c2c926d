//! # CropWatch Outbreak Engine
//!
//! Ingests geotagged crop-disease reports, maintains regional combo
//! counters and per-disease recovery votes, derives spatial outbreak
//! clusters from active reports, and pushes threshold alerts to connected
//! viewers over SSE.
//!
//! Data flows one way: HTTP writes mutate the SQLite stores and announce
//! themselves on the event bus; the aggregation task rebuilds the cluster
//! snapshot from the stores; SSE sessions personalize that snapshot per
//! viewer location.

pub mod alerts;
pub mod api;
pub mod cluster;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod state;
pub mod store;

pub use error::{Error, Result};
