//! GeoPackage tile pyramid generation.
//!
//! This crate writes Web Mercator raster tile sets into GeoPackage containers
//! (single SQLite files holding metadata tables and per-tile image blobs) and
//! updates existing tile sets in place, re-gridding stored tiles when the
//! covered bounding box grows.

mod error;
pub mod generator;
pub mod gpkg;
mod source;

pub use error::GeneratorError;
pub use generator::TileGenerator;
pub use gpkg::GeoPackage;
pub use source::TileSource;
