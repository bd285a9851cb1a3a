//! This module defines the `GeoBBox` struct, a geographical bounding box in
//! WGS84 degrees, and operations on it (validation, union, projection).

use super::{MercBBox, WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MIN_LAT, lat_to_mercator, lon_to_mercator};
use anyhow::{Result, ensure};
use std::fmt::Debug;

/// A geographical bounding box in WGS84 degrees, represented by four `f64`
/// values: `[min_lon, min_lat, max_lon, max_lat]` or equivalently
/// `[west, south, east, north]`.
///
/// Logically `min_lon <= max_lon` and `min_lat <= max_lat`.
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox(pub f64, pub f64, pub f64, pub f64);

impl GeoBBox {
	/// Creates a new `GeoBBox` from `[min_lon, min_lat, max_lon, max_lat]`.
	pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> GeoBBox {
		GeoBBox(min_lon, min_lat, max_lon, max_lat)
	}

	/// The full world within the Mercator-representable latitude range.
	pub fn full_world() -> GeoBBox {
		GeoBBox(-180.0, WEB_MERCATOR_MIN_LAT, 180.0, WEB_MERCATOR_MAX_LAT)
	}

	/// Returns the bounding box as `[west, south, east, north]`.
	pub fn as_array(&self) -> [f64; 4] {
		[self.0, self.1, self.2, self.3]
	}

	/// Returns a copy with latitudes clamped to the Mercator-representable range.
	pub fn clamped_to_mercator_lat(mut self) -> GeoBBox {
		self.1 = self.1.max(WEB_MERCATOR_MIN_LAT);
		self.3 = self.3.min(WEB_MERCATOR_MAX_LAT);
		self
	}

	/// Expands the bounding box (in place) so that it includes `other`.
	pub fn extend(&mut self, other: &GeoBBox) {
		self.0 = self.0.min(other.0);
		self.1 = self.1.min(other.1);
		self.2 = self.2.max(other.2);
		self.3 = self.3.max(other.3);
	}

	/// Non-mutating version of [`GeoBBox::extend`].
	pub fn extended(mut self, other: &GeoBBox) -> GeoBBox {
		self.extend(other);
		self
	}

	/// Checks whether `other` lies entirely inside this bounding box.
	pub fn contains(&self, other: &GeoBBox) -> bool {
		self.0 <= other.0 && self.1 <= other.1 && self.2 >= other.2 && self.3 >= other.3
	}

	/// Projects the bounding box to Web Mercator meters.
	pub fn to_mercator(&self) -> MercBBox {
		MercBBox::new(
			lon_to_mercator(self.0),
			lat_to_mercator(self.1),
			lon_to_mercator(self.2),
			lat_to_mercator(self.3),
		)
	}

	/// Validates coordinate ranges and ordering.
	///
	/// # Errors
	///
	/// Returns an error if any edge is out of range or the box is inverted.
	pub fn check(&self) -> Result<()> {
		ensure!(self.0 >= -180., "min_lon ({}) must be >= -180", self.0);
		ensure!(self.1 >= -90., "min_lat ({}) must be >= -90", self.1);
		ensure!(self.2 <= 180., "max_lon ({}) must be <= 180", self.2);
		ensure!(self.3 <= 90., "max_lat ({}) must be <= 90", self.3);
		ensure!(self.0 <= self.2, "min_lon ({}) must be <= max_lon ({})", self.0, self.2);
		ensure!(self.1 <= self.3, "min_lat ({}) must be <= max_lat ({})", self.1, self.3);
		Ok(())
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_fmt(format_args!("[{},{},{},{}]", self.0, self.1, self.2, self.3))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extend() {
		let mut bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0);
		bbox.extend(&GeoBBox::new(-20.0, 0.0, 0.0, 15.0));
		assert_eq!(bbox, GeoBBox::new(-20.0, -5.0, 10.0, 15.0));
	}

	#[test]
	fn extended_is_superset() {
		let a = GeoBBox::new(-10.0, -5.0, 10.0, 5.0);
		let b = GeoBBox::new(5.0, 3.0, 25.0, 40.0);
		let u = a.extended(&b);
		assert!(u.contains(&a));
		assert!(u.contains(&b));
	}

	#[test]
	fn clamp() {
		let bbox = GeoBBox::new(-180.0, -90.0, 180.0, 90.0).clamped_to_mercator_lat();
		assert_eq!(bbox, GeoBBox::full_world());
	}

	#[test]
	fn check() {
		assert!(GeoBBox::new(-180.0, -90.0, 180.0, 90.0).check().is_ok());
		assert!(GeoBBox::new(-181.0, 0.0, 0.0, 1.0).check().is_err());
		assert!(GeoBBox::new(10.0, 0.0, 0.0, 1.0).check().is_err());
	}
}
