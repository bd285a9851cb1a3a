//! Spherical Web Mercator forward and inverse transforms.
//!
//! All transforms are pure functions so that callers can stay hermetic; there
//! is no process-wide projection state. Only WGS84 (EPSG:4326) and spherical
//! Web Mercator (EPSG:3857) are supported.

use super::{
	EARTH_RADIUS, EPSG_WEB_MERCATOR, EPSG_WGS84, GeoBBox, HALF_WORLD_WIDTH, WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MIN_LAT,
};
use anyhow::{Result, bail};
use std::f64::consts::PI;

/// Projects a WGS84 longitude in degrees to Web Mercator meters.
pub fn lon_to_mercator(lon: f64) -> f64 {
	lon * HALF_WORLD_WIDTH / 180.0
}

/// Projects a WGS84 latitude in degrees to Web Mercator meters.
///
/// The latitude is clamped to the Mercator-representable range first.
pub fn lat_to_mercator(lat: f64) -> f64 {
	let lat = lat.clamp(WEB_MERCATOR_MIN_LAT, WEB_MERCATOR_MAX_LAT);
	(lat * PI / 180.0).tan().asinh() * EARTH_RADIUS
}

/// Unprojects a Web Mercator x coordinate in meters to WGS84 degrees.
pub fn mercator_to_lon(x: f64) -> f64 {
	x / HALF_WORLD_WIDTH * 180.0
}

/// Unprojects a Web Mercator y coordinate in meters to WGS84 degrees.
pub fn mercator_to_lat(y: f64) -> f64 {
	(y / EARTH_RADIUS).sinh().atan() * 180.0 / PI
}

/// Transforms a stored bounding box in the given CRS into WGS84.
pub fn bbox_to_wgs84(bbox: [f64; 4], epsg: i64) -> Result<GeoBBox> {
	match epsg {
		EPSG_WGS84 => Ok(GeoBBox::new(bbox[0], bbox[1], bbox[2], bbox[3])),
		EPSG_WEB_MERCATOR => Ok(GeoBBox::new(
			mercator_to_lon(bbox[0]),
			mercator_to_lat(bbox[1]),
			mercator_to_lon(bbox[2]),
			mercator_to_lat(bbox[3]),
		)),
		_ => bail!("unsupported coordinate reference system: EPSG:{epsg}"),
	}
}

/// Transforms a WGS84 bounding box into the given CRS for storage.
pub fn bbox_from_wgs84(bbox: &GeoBBox, epsg: i64) -> Result<[f64; 4]> {
	match epsg {
		EPSG_WGS84 => Ok(bbox.as_array()),
		EPSG_WEB_MERCATOR => Ok([
			lon_to_mercator(bbox.0),
			lat_to_mercator(bbox.1),
			lon_to_mercator(bbox.2),
			lat_to_mercator(bbox.3),
		]),
		_ => bail!("unsupported coordinate reference system: EPSG:{epsg}"),
	}
}
