use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};

/// One row of `gpkg_contents`.
#[derive(Clone, Debug)]
pub struct Contents {
	pub table_name: String,
	pub data_type: String,
	pub bbox: [f64; 4],
	pub srs_id: i64,
	pub last_change: DateTime<Utc>,
}

pub struct ContentsDao {
	pool: Pool<SqliteConnectionManager>,
}

impl ContentsDao {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> ContentsDao {
		ContentsDao { pool }
	}

	pub fn query_for_id(&self, table_name: &str) -> Result<Option<Contents>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT table_name, data_type, min_x, min_y, max_x, max_y, srs_id, last_change
			 FROM gpkg_contents WHERE table_name = ?1",
		)?;
		let mut rows = stmt.query_map(params![table_name], |row| {
			Ok((
				row.get::<_, String>(0)?,
				row.get::<_, String>(1)?,
				[row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
				row.get::<_, i64>(6)?,
				row.get::<_, String>(7)?,
			))
		})?;

		match rows.next().transpose()? {
			None => Ok(None),
			Some((table_name, data_type, bbox, srs_id, last_change)) => Ok(Some(Contents {
				table_name,
				data_type,
				bbox,
				srs_id,
				last_change: parse_timestamp(&last_change)?,
			})),
		}
	}

	pub fn update(&self, contents: &Contents) -> Result<()> {
		self.pool.get()?.execute(
			"UPDATE gpkg_contents
			 SET data_type = ?2, min_x = ?3, min_y = ?4, max_x = ?5, max_y = ?6, srs_id = ?7, last_change = ?8
			 WHERE table_name = ?1",
			params![
				contents.table_name,
				contents.data_type,
				contents.bbox[0],
				contents.bbox[1],
				contents.bbox[2],
				contents.bbox[3],
				contents.srs_id,
				format_timestamp(&contents.last_change),
			],
		)?;
		Ok(())
	}
}

/// GeoPackage stores timestamps as `%Y-%m-%dT%H:%M:%S.%3fZ` text.
pub(crate) fn format_timestamp(when: &DateTime<Utc>) -> String {
	when.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(text)
		.map(|t| t.with_timezone(&Utc))
		.with_context(|| format!("invalid timestamp \"{text}\""))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gpkg::GeoPackage;
	use assert_fs::NamedTempFile;
	use mercatile_core::GeoBBox;

	#[test]
	fn timestamp_round_trip() -> Result<()> {
		let now = Utc::now();
		let parsed = parse_timestamp(&format_timestamp(&now))?;
		assert!((now - parsed).num_milliseconds().abs() <= 1);
		Ok(())
	}

	#[test]
	fn update_bbox_and_last_change() -> Result<()> {
		let file = NamedTempFile::new("contents.gpkg")?;
		let gpkg = GeoPackage::open(file.path())?;
		let geo = GeoBBox::new(-10.0, -10.0, 10.0, 10.0);
		gpkg.create_tile_table_with_metadata("tiles", &geo, &geo.to_mercator())?;

		let dao = gpkg.contents_dao();
		let mut contents = dao.query_for_id("tiles")?.unwrap();
		assert_eq!(contents.data_type, "tiles");
		assert_eq!(contents.bbox, geo.as_array());

		contents.bbox = [-20.0, -20.0, 20.0, 20.0];
		let stamp = contents.last_change + chrono::Duration::seconds(5);
		contents.last_change = stamp;
		dao.update(&contents)?;

		let reread = dao.query_for_id("tiles")?.unwrap();
		assert_eq!(reread.bbox, [-20.0, -20.0, 20.0, 20.0]);
		// the text form keeps millisecond precision
		assert_eq!(reread.last_change, parse_timestamp(&format_timestamp(&stamp))?);
		Ok(())
	}
}
