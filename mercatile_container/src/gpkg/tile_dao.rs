//! This module provides the `TileDao` struct, the data access object for one
//! tile table and its per-zoom tile matrices.

use super::{TileMatrix, TileMatrixSet};
use anyhow::Result;
use mercatile_core::{Blob, bbox_to_wgs84, tiles_per_side};
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};

/// Position of one stored tile, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePosition {
	pub id: i64,
	pub column: u64,
	pub row: u64,
}

/// Data access object bound to one tile table.
pub struct TileDao {
	pool: Pool<SqliteConnectionManager>,
	table_name: String,
}

impl TileDao {
	pub fn new(pool: Pool<SqliteConnectionManager>, table_name: &str) -> TileDao {
		TileDao {
			pool,
			table_name: table_name.to_string(),
		}
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	/// Inserts a new tile row. Fails on a `(zoom, column, row)` collision.
	pub fn insert(&self, zoom_level: u8, column: u64, row: u64, data: &Blob) -> Result<()> {
		self.pool.get()?.execute(
			&format!(
				"INSERT INTO \"{}\" (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
				self.table_name
			),
			params![zoom_level, column as i64, row as i64, data.as_slice()],
		)?;
		Ok(())
	}

	/// Moves a stored tile to a new `(column, row)`.
	pub fn update_position(&self, id: i64, column: u64, row: u64) -> Result<()> {
		self.pool.get()?.execute(
			&format!(
				"UPDATE \"{}\" SET tile_column = ?2, tile_row = ?3 WHERE id = ?1",
				self.table_name
			),
			params![id, column as i64, row as i64],
		)?;
		Ok(())
	}

	/// Deletes the tile at `(zoom, column, row)`, returning the number of
	/// rows removed (0 or 1).
	pub fn delete_tile(&self, zoom_level: u8, column: u64, row: u64) -> Result<usize> {
		Ok(self.pool.get()?.execute(
			&format!(
				"DELETE FROM \"{}\" WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
				self.table_name
			),
			params![zoom_level, column as i64, row as i64],
		)?)
	}

	/// Deletes every tile of a zoom level within an inclusive column/row range.
	pub fn delete_zoom_range(
		&self,
		zoom_level: u8,
		column_min: u64,
		row_min: u64,
		column_max: u64,
		row_max: u64,
	) -> Result<usize> {
		Ok(self.pool.get()?.execute(
			&format!(
				"DELETE FROM \"{}\" WHERE zoom_level = ?1
				 AND tile_column >= ?2 AND tile_column <= ?3
				 AND tile_row >= ?4 AND tile_row <= ?5",
				self.table_name
			),
			params![
				zoom_level,
				column_min as i64,
				column_max as i64,
				row_min as i64,
				row_max as i64
			],
		)?)
	}

	/// All tile positions of a zoom level, highest columns and rows first.
	///
	/// The relocation pass relies on this ordering: a grown bounding box only
	/// shifts tiles toward higher indices, so rewriting from the highest
	/// position downward never collides with a not-yet-moved row. The result
	/// is fully materialized, releasing the cursor before any update runs.
	pub fn query_positions_descending(&self, zoom_level: u8) -> Result<Vec<TilePosition>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!(
			"SELECT id, tile_column, tile_row FROM \"{}\" WHERE zoom_level = ?1
			 ORDER BY tile_column DESC, tile_row DESC",
			self.table_name
		))?;
		let rows = stmt.query_map(params![zoom_level], |row| {
			Ok(TilePosition {
				id: row.get(0)?,
				column: row.get::<_, i64>(1)? as u64,
				row: row.get::<_, i64>(2)? as u64,
			})
		})?;
		rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
	}

	/// Payload of the tile at `(zoom, column, row)`, if present.
	pub fn query_tile(&self, zoom_level: u8, column: u64, row: u64) -> Result<Option<Blob>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(&format!(
			"SELECT tile_data FROM \"{}\" WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
			self.table_name
		))?;
		let mut rows = stmt.query_map(params![zoom_level, column as i64, row as i64], |row| {
			row.get::<_, Vec<u8>>(0)
		})?;
		Ok(rows.next().transpose()?.map(Blob::from))
	}

	/// Number of stored tiles, optionally restricted to one zoom level.
	pub fn count(&self, zoom_level: Option<u8>) -> Result<u64> {
		let conn = self.pool.get()?;
		let count: i64 = match zoom_level {
			Some(zoom) => conn.query_row(
				&format!("SELECT COUNT(*) FROM \"{}\" WHERE zoom_level = ?1", self.table_name),
				params![zoom],
				|row| row.get(0),
			)?,
			None => conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.table_name), [], |row| {
				row.get(0)
			})?,
		};
		Ok(count as u64)
	}

	/// Lowest zoom level with a tile matrix, if any.
	pub fn min_zoom(&self) -> Result<Option<u8>> {
		self.zoom_bound("MIN")
	}

	/// Highest zoom level with a tile matrix, if any.
	pub fn max_zoom(&self) -> Result<Option<u8>> {
		self.zoom_bound("MAX")
	}

	fn zoom_bound(&self, aggregate: &str) -> Result<Option<u8>> {
		let conn = self.pool.get()?;
		let zoom: Option<i64> = conn.query_row(
			&format!("SELECT {aggregate}(zoom_level) FROM gpkg_tile_matrix WHERE table_name = ?1"),
			params![self.table_name],
			|row| row.get(0),
		)?;
		Ok(zoom.map(|z| z as u8))
	}

	/// The tile matrix of this table at a zoom level, if present.
	pub fn tile_matrix_at(&self, zoom_level: u8) -> Result<Option<TileMatrix>> {
		super::TileMatrixDao::new(self.pool.clone()).query(&self.table_name, zoom_level)
	}

	/// Whether the stored tiles use google addressing: the matrix set spans
	/// the full world and every tile matrix at zoom z is `2^z x 2^z`.
	pub fn is_google_tiles(&self, tile_matrix_set: &TileMatrixSet) -> Result<bool> {
		let bbox = bbox_to_wgs84(tile_matrix_set.bbox, tile_matrix_set.srs_id)?;

		let world = mercatile_core::GeoBBox::full_world();
		let tolerance = 1e-6;
		if bbox.0 > world.0 + tolerance
			|| bbox.1 > world.1 + tolerance
			|| bbox.2 < world.2 - tolerance
			|| bbox.3 < world.3 - tolerance
		{
			return Ok(false);
		}

		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT zoom_level, matrix_width, matrix_height FROM gpkg_tile_matrix WHERE table_name = ?1",
		)?;
		let rows = stmt.query_map(params![self.table_name], |row| {
			Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
		})?;

		for row in rows {
			let (zoom, width, height) = row?;
			let side = tiles_per_side(zoom as u8) as i64;
			if width != side || height != side {
				return Ok(false);
			}
		}
		Ok(true)
	}
}
