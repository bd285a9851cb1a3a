//! This module provides the `GeoPackage` struct, a handle on one GeoPackage
//! SQLite file, with the DDL for the metadata tables and the operations that
//! span several of them.

use super::contents::format_timestamp;
use super::{ContentsDao, SrsDao, TileDao, TileMatrixDao, TileMatrixSet, TileMatrixSetDao};
use anyhow::{Result, ensure};
use chrono::Utc;
use log::{trace, warn};
use mercatile_core::{EPSG_WEB_MERCATOR, EPSG_WGS84, GeoBBox, MercBBox};
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};
use std::path::Path;

/// A handle on one GeoPackage file.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct GeoPackage {
	pool: Pool<SqliteConnectionManager>,
}

impl GeoPackage {
	/// Opens a GeoPackage file, creating it and its metadata tables if needed.
	pub fn open(path: &Path) -> Result<GeoPackage> {
		trace!("open {path:?}");

		let manager = SqliteConnectionManager::file(path);
		let pool = Pool::builder().max_size(10).build(manager)?;

		pool.get()?.execute_batch(
			"CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
				srs_name TEXT NOT NULL,
				srs_id INTEGER PRIMARY KEY,
				organization TEXT NOT NULL,
				organization_coordsys_id INTEGER NOT NULL,
				definition TEXT NOT NULL,
				description TEXT
			);
			CREATE TABLE IF NOT EXISTS gpkg_contents (
				table_name TEXT PRIMARY KEY,
				data_type TEXT NOT NULL,
				identifier TEXT UNIQUE,
				description TEXT DEFAULT '',
				last_change TEXT NOT NULL,
				min_x REAL, min_y REAL, max_x REAL, max_y REAL,
				srs_id INTEGER
			);
			CREATE TABLE IF NOT EXISTS gpkg_tile_matrix_set (
				table_name TEXT PRIMARY KEY,
				srs_id INTEGER NOT NULL,
				min_x REAL NOT NULL, min_y REAL NOT NULL,
				max_x REAL NOT NULL, max_y REAL NOT NULL
			);
			CREATE TABLE IF NOT EXISTS gpkg_tile_matrix (
				table_name TEXT NOT NULL,
				zoom_level INTEGER NOT NULL,
				matrix_width INTEGER NOT NULL,
				matrix_height INTEGER NOT NULL,
				tile_width INTEGER NOT NULL,
				tile_height INTEGER NOT NULL,
				pixel_x_size REAL NOT NULL,
				pixel_y_size REAL NOT NULL,
				PRIMARY KEY (table_name, zoom_level)
			);",
		)?;

		Ok(GeoPackage { pool })
	}

	pub fn srs_dao(&self) -> SrsDao {
		SrsDao::new(self.pool.clone())
	}

	pub fn contents_dao(&self) -> ContentsDao {
		ContentsDao::new(self.pool.clone())
	}

	pub fn tile_matrix_set_dao(&self) -> TileMatrixSetDao {
		TileMatrixSetDao::new(self.pool.clone())
	}

	pub fn tile_matrix_dao(&self) -> TileMatrixDao {
		TileMatrixDao::new(self.pool.clone())
	}

	pub fn tile_dao(&self, table_name: &str) -> TileDao {
		TileDao::new(self.pool.clone(), table_name)
	}

	/// Whether a table of the given name exists.
	pub fn table_exists(&self, table_name: &str) -> Result<bool> {
		let conn = self.pool.get()?;
		let count: i64 = conn.query_row(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
			params![table_name],
			|row| row.get(0),
		)?;
		Ok(count > 0)
	}

	/// Creates a tile table together with its contents and tile matrix set
	/// rows. The contents bounding box is stored in WGS84, the matrix set
	/// bounding box in Web Mercator.
	pub fn create_tile_table_with_metadata(
		&self,
		table_name: &str,
		geo_bbox: &GeoBBox,
		merc_bbox: &MercBBox,
	) -> Result<TileMatrixSet> {
		check_table_name(table_name)?;
		trace!("create tile table {table_name}");

		self.srs_dao().get_or_create(EPSG_WGS84)?;
		self.srs_dao().get_or_create(EPSG_WEB_MERCATOR)?;

		let conn = self.pool.get()?;
		conn.execute_batch(&format!(
			"CREATE TABLE \"{table_name}\" (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				zoom_level INTEGER NOT NULL,
				tile_column INTEGER NOT NULL,
				tile_row INTEGER NOT NULL,
				tile_data BLOB NOT NULL,
				UNIQUE (zoom_level, tile_column, tile_row)
			);"
		))?;

		conn.execute(
			"INSERT INTO gpkg_contents (table_name, data_type, identifier, last_change, min_x, min_y, max_x, max_y, srs_id)
			 VALUES (?1, 'tiles', ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
			params![
				table_name,
				format_timestamp(&Utc::now()),
				geo_bbox.0,
				geo_bbox.1,
				geo_bbox.2,
				geo_bbox.3,
				EPSG_WGS84,
			],
		)?;

		let tile_matrix_set = TileMatrixSet {
			table_name: table_name.to_string(),
			srs_id: EPSG_WEB_MERCATOR,
			bbox: [merc_bbox.0, merc_bbox.1, merc_bbox.2, merc_bbox.3],
		};
		self.tile_matrix_set_dao().create(&tile_matrix_set)?;

		Ok(tile_matrix_set)
	}

	/// Drops a tile table and all of its metadata rows, swallowing errors.
	pub fn delete_table_quietly(&self, table_name: &str) {
		trace!("delete table {table_name}");

		if let Err(e) = self.delete_table(table_name) {
			warn!("failed to delete table {table_name}: {e}");
		}
	}

	fn delete_table(&self, table_name: &str) -> Result<()> {
		check_table_name(table_name)?;

		let conn = self.pool.get()?;
		conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{table_name}\";"))?;
		conn.execute("DELETE FROM gpkg_tile_matrix WHERE table_name = ?1", params![table_name])?;
		conn.execute(
			"DELETE FROM gpkg_tile_matrix_set WHERE table_name = ?1",
			params![table_name],
		)?;
		conn.execute("DELETE FROM gpkg_contents WHERE table_name = ?1", params![table_name])?;
		Ok(())
	}
}

/// Tile table names end up inside DDL statements, so restrict them to
/// identifier characters.
pub(crate) fn check_table_name(table_name: &str) -> Result<()> {
	ensure!(
		!table_name.is_empty()
			&& table_name
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_')
			&& !table_name.starts_with(|c: char| c.is_ascii_digit()),
		"invalid tile table name \"{table_name}\""
	);
	Ok(())
}
