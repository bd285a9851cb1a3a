//! This module defines the `MercBBox` struct, a bounding box in Web Mercator
//! meters. All tile grid math operates in this coordinate space.

use super::{GeoBBox, mercator_to_lat, mercator_to_lon};
use std::fmt::Debug;

/// A bounding box in Web Mercator meters (EPSG:3857), represented by four
/// `f64` values: `[min_x, min_y, max_x, max_y]`.
#[derive(Clone, Copy, PartialEq)]
pub struct MercBBox(pub f64, pub f64, pub f64, pub f64);

impl MercBBox {
	/// Creates a new `MercBBox` from `[min_x, min_y, max_x, max_y]`.
	pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MercBBox {
		MercBBox(min_x, min_y, max_x, max_y)
	}

	pub fn width(&self) -> f64 {
		self.2 - self.0
	}

	pub fn height(&self) -> f64 {
		self.3 - self.1
	}

	/// Center x in meters.
	pub fn mid_x(&self) -> f64 {
		self.0 + self.width() / 2.0
	}

	/// Center y in meters.
	pub fn mid_y(&self) -> f64 {
		self.1 + self.height() / 2.0
	}

	/// Unprojects the bounding box to WGS84 degrees.
	pub fn to_geo(&self) -> GeoBBox {
		GeoBBox::new(
			mercator_to_lon(self.0),
			mercator_to_lat(self.1),
			mercator_to_lon(self.2),
			mercator_to_lat(self.3),
		)
	}

	/// Column of the matrix cell containing the x coordinate, when this box is
	/// divided into `matrix_width` equal columns.
	///
	/// Returns `-1` left of the box and `matrix_width` at or beyond the right
	/// edge, so callers can clamp.
	pub fn tile_column(&self, matrix_width: u64, x: f64) -> i64 {
		if x < self.0 {
			-1
		} else if x >= self.2 {
			matrix_width as i64
		} else {
			((x - self.0) / (self.width() / matrix_width as f64)) as i64
		}
	}

	/// Row of the matrix cell containing the y coordinate, when this box is
	/// divided into `matrix_height` equal rows. Row 0 is the northernmost row.
	///
	/// Returns `-1` at or above the top edge and `matrix_height` below the
	/// bottom edge, so callers can clamp.
	pub fn tile_row(&self, matrix_height: u64, y: f64) -> i64 {
		if y < self.1 {
			matrix_height as i64
		} else if y >= self.3 {
			-1
		} else {
			((self.3 - y) / (self.height() / matrix_height as f64)) as i64
		}
	}

	/// Extent of one cell of a `matrix_width x matrix_height` division of this
	/// bounding box. Row 0 is the northernmost row.
	pub fn cell_bbox(&self, matrix_width: u64, matrix_height: u64, column: u64, row: u64) -> MercBBox {
		let cell_width = self.width() / matrix_width as f64;
		let cell_height = self.height() / matrix_height as f64;

		let min_x = self.0 + cell_width * column as f64;
		let max_y = self.3 - cell_height * row as f64;

		MercBBox(min_x, max_y - cell_height, min_x + cell_width, max_y)
	}
}

impl Debug for MercBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_fmt(format_args!("[{},{},{},{}]", self.0, self.1, self.2, self.3))
	}
}
