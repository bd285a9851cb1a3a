use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};

/// One row of `gpkg_tile_matrix_set`: the outer bounding box within which the
/// per-zoom tile matrices of one tile table are laid out.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrixSet {
	pub table_name: String,
	pub srs_id: i64,
	pub bbox: [f64; 4],
}

pub struct TileMatrixSetDao {
	pool: Pool<SqliteConnectionManager>,
}

impl TileMatrixSetDao {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> TileMatrixSetDao {
		TileMatrixSetDao { pool }
	}

	/// Whether the `gpkg_tile_matrix_set` table itself exists.
	pub fn table_exists(&self) -> Result<bool> {
		let conn = self.pool.get()?;
		let count: i64 = conn.query_row(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'gpkg_tile_matrix_set'",
			[],
			|row| row.get(0),
		)?;
		Ok(count > 0)
	}

	pub fn id_exists(&self, table_name: &str) -> Result<bool> {
		Ok(self.query_for_id(table_name)?.is_some())
	}

	pub fn query_for_id(&self, table_name: &str) -> Result<Option<TileMatrixSet>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT table_name, srs_id, min_x, min_y, max_x, max_y FROM gpkg_tile_matrix_set WHERE table_name = ?1",
		)?;
		let mut rows = stmt.query_map(params![table_name], |row| {
			Ok(TileMatrixSet {
				table_name: row.get(0)?,
				srs_id: row.get(1)?,
				bbox: [row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
			})
		})?;
		rows.next().transpose().map_err(Into::into)
	}

	pub fn create(&self, set: &TileMatrixSet) -> Result<()> {
		self.pool.get()?.execute(
			"INSERT INTO gpkg_tile_matrix_set (table_name, srs_id, min_x, min_y, max_x, max_y)
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
			params![
				set.table_name,
				set.srs_id,
				set.bbox[0],
				set.bbox[1],
				set.bbox[2],
				set.bbox[3]
			],
		)?;
		Ok(())
	}

	pub fn update(&self, set: &TileMatrixSet) -> Result<()> {
		self.pool.get()?.execute(
			"UPDATE gpkg_tile_matrix_set SET srs_id = ?2, min_x = ?3, min_y = ?4, max_x = ?5, max_y = ?6
			 WHERE table_name = ?1",
			params![
				set.table_name,
				set.srs_id,
				set.bbox[0],
				set.bbox[1],
				set.bbox[2],
				set.bbox[3]
			],
		)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gpkg::GeoPackage;
	use assert_fs::NamedTempFile;
	use mercatile_core::EPSG_WEB_MERCATOR;

	#[test]
	fn create_query_update() -> Result<()> {
		let file = NamedTempFile::new("set.gpkg")?;
		let gpkg = GeoPackage::open(file.path())?;
		let dao = gpkg.tile_matrix_set_dao();

		assert!(dao.table_exists()?);
		assert!(!dao.id_exists("tiles")?);

		let mut set = TileMatrixSet {
			table_name: "tiles".to_string(),
			srs_id: EPSG_WEB_MERCATOR,
			bbox: [0.0, 0.0, 100.0, 100.0],
		};
		dao.create(&set)?;
		assert_eq!(dao.query_for_id("tiles")?.unwrap(), set);

		set.bbox = [-100.0, -100.0, 100.0, 100.0];
		dao.update(&set)?;
		assert_eq!(dao.query_for_id("tiles")?.unwrap(), set);
		Ok(())
	}
}
