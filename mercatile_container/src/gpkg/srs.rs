use anyhow::{Result, bail};
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};

use mercatile_core::{EPSG_WEB_MERCATOR, EPSG_WGS84};

/// One row of `gpkg_spatial_ref_sys`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialReferenceSystem {
	pub srs_name: String,
	pub srs_id: i64,
	pub organization: String,
	pub organization_coordsys_id: i64,
	pub definition: String,
}

/// Registry of coordinate reference systems known to the container.
pub struct SrsDao {
	pool: Pool<SqliteConnectionManager>,
}

impl SrsDao {
	pub fn new(pool: Pool<SqliteConnectionManager>) -> SrsDao {
		SrsDao { pool }
	}

	/// Fetches the spatial reference system for an EPSG code, inserting the
	/// well-known definition on first use.
	pub fn get_or_create(&self, epsg: i64) -> Result<SpatialReferenceSystem> {
		if let Some(srs) = self.query_for_id(epsg)? {
			return Ok(srs);
		}

		let srs = well_known(epsg)?;
		self.pool.get()?.execute(
			"INSERT INTO gpkg_spatial_ref_sys (srs_name, srs_id, organization, organization_coordsys_id, definition)
			 VALUES (?1, ?2, ?3, ?4, ?5)",
			params![
				srs.srs_name,
				srs.srs_id,
				srs.organization,
				srs.organization_coordsys_id,
				srs.definition
			],
		)?;
		Ok(srs)
	}

	pub fn query_for_id(&self, srs_id: i64) -> Result<Option<SpatialReferenceSystem>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT srs_name, srs_id, organization, organization_coordsys_id, definition
			 FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
		)?;
		let mut rows = stmt.query_map(params![srs_id], |row| {
			Ok(SpatialReferenceSystem {
				srs_name: row.get(0)?,
				srs_id: row.get(1)?,
				organization: row.get(2)?,
				organization_coordsys_id: row.get(3)?,
				definition: row.get(4)?,
			})
		})?;
		rows.next().transpose().map_err(Into::into)
	}
}

fn well_known(epsg: i64) -> Result<SpatialReferenceSystem> {
	match epsg {
		EPSG_WGS84 => Ok(SpatialReferenceSystem {
			srs_name: "WGS 84 geodetic".to_string(),
			srs_id: EPSG_WGS84,
			organization: "EPSG".to_string(),
			organization_coordsys_id: EPSG_WGS84,
			definition: "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]".to_string(),
		}),
		EPSG_WEB_MERCATOR => Ok(SpatialReferenceSystem {
			srs_name: "WGS 84 / Pseudo-Mercator".to_string(),
			srs_id: EPSG_WEB_MERCATOR,
			organization: "EPSG".to_string(),
			organization_coordsys_id: EPSG_WEB_MERCATOR,
			definition: "PROJCS[\"WGS 84 / Pseudo-Mercator\",GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],PROJECTION[\"Mercator_1SP\"],PARAMETER[\"central_meridian\",0],PARAMETER[\"scale_factor\",1],PARAMETER[\"false_easting\",0],PARAMETER[\"false_northing\",0],UNIT[\"metre\",1]]".to_string(),
		}),
		_ => bail!("no well-known definition for EPSG:{epsg}"),
	}
}
