//! Minimal GeoPackage container layer: the SQLite metadata tables and DAOs
//! the tile generator mutates.

mod contents;
mod geopackage;
mod srs;
mod tile_dao;
mod tile_matrix;
mod tile_matrix_set;

pub use contents::*;
pub use geopackage::*;
pub use srs::*;
pub use tile_dao::*;
pub use tile_matrix::*;
pub use tile_matrix_set::*;
