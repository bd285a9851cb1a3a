//! Geographic and Web Mercator constants used across Mercatile.

use std::f64::consts::PI;

/// WGS84 semi-major axis (equatorial radius) in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the world in Web Mercator meters (PI * EARTH_RADIUS).
pub const HALF_WORLD_WIDTH: f64 = PI * EARTH_RADIUS;

/// Full width of the world in Web Mercator meters.
pub const WORLD_WIDTH: f64 = 2.0 * HALF_WORLD_WIDTH;

/// Maximum latitude in degrees representable in Web Mercator (EPSG:3857).
///
/// Equals `atan(sinh(PI))` in degrees. Latitudes beyond this are clamped
/// before projecting.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude in degrees representable in Web Mercator (EPSG:3857).
pub const WEB_MERCATOR_MIN_LAT: f64 = -WEB_MERCATOR_MAX_LAT;

/// EPSG code of the WGS84 geographic coordinate reference system.
pub const EPSG_WGS84: i64 = 4326;

/// EPSG code of the spherical Web Mercator coordinate reference system.
pub const EPSG_WEB_MERCATOR: i64 = 3857;

/// Number of tiles along one side of the world grid at a zoom level.
pub fn tiles_per_side(zoom: u8) -> u32 {
	assert!(zoom <= 31, "zoom ({zoom}) must be <= 31");
	2u32.pow(zoom as u32)
}

/// Width (and height) of one world-grid tile in Web Mercator meters at a zoom level.
pub fn tile_size(zoom: u8) -> f64 {
	WORLD_WIDTH / tiles_per_side(zoom) as f64
}
