use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};

/// One row of `gpkg_tile_matrix`: the grid dimensions and pixel sizes of one
/// tile table at one zoom level.
///
/// Invariant: `pixel_x_size = matrix_set_width / matrix_width / tile_width`
/// (in CRS units), and the same for y.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrix {
	pub table_name: String,
	pub zoom_level: u8,
	pub matrix_width: u64,
	pub matrix_height: u64,
	pub tile_width: u32,
	pub tile_height: u32,
	pub pixel_x_size: f64,
	pub pixel_y_size: f64,
}

pub struct TileMatrixDao {
	pool: Pool<SqliteConnectionManager>,
}

impl TileMatrixDao {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> TileMatrixDao {
		TileMatrixDao { pool }
	}

	pub fn id_exists(&self, table_name: &str, zoom_level: u8) -> Result<bool> {
		Ok(self.query(table_name, zoom_level)?.is_some())
	}

	pub fn query(&self, table_name: &str, zoom_level: u8) -> Result<Option<TileMatrix>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT matrix_width, matrix_height, tile_width, tile_height, pixel_x_size, pixel_y_size
			 FROM gpkg_tile_matrix WHERE table_name = ?1 AND zoom_level = ?2",
		)?;
		let mut rows = stmt.query_map(params![table_name, zoom_level], |row| {
			Ok(TileMatrix {
				table_name: table_name.to_string(),
				zoom_level,
				matrix_width: row.get::<_, i64>(0)? as u64,
				matrix_height: row.get::<_, i64>(1)? as u64,
				tile_width: row.get::<_, i64>(2)? as u32,
				tile_height: row.get::<_, i64>(3)? as u32,
				pixel_x_size: row.get(4)?,
				pixel_y_size: row.get(5)?,
			})
		})?;
		rows.next().transpose().map_err(Into::into)
	}

	pub fn create(&self, matrix: &TileMatrix) -> Result<()> {
		self.pool.get()?.execute(
			"INSERT INTO gpkg_tile_matrix
			 (table_name, zoom_level, matrix_width, matrix_height, tile_width, tile_height, pixel_x_size, pixel_y_size)
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
			params![
				matrix.table_name,
				matrix.zoom_level,
				matrix.matrix_width as i64,
				matrix.matrix_height as i64,
				matrix.tile_width as i64,
				matrix.tile_height as i64,
				matrix.pixel_x_size,
				matrix.pixel_y_size,
			],
		)?;
		Ok(())
	}

	pub fn update(&self, matrix: &TileMatrix) -> Result<()> {
		self.pool.get()?.execute(
			"UPDATE gpkg_tile_matrix
			 SET matrix_width = ?3, matrix_height = ?4, tile_width = ?5, tile_height = ?6, pixel_x_size = ?7, pixel_y_size = ?8
			 WHERE table_name = ?1 AND zoom_level = ?2",
			params![
				matrix.table_name,
				matrix.zoom_level,
				matrix.matrix_width as i64,
				matrix.matrix_height as i64,
				matrix.tile_width as i64,
				matrix.tile_height as i64,
				matrix.pixel_x_size,
				matrix.pixel_y_size,
			],
		)?;
		Ok(())
	}
}
