//! This module defines the `TileGrid` struct, an inclusive rectangle of tile
//! coordinates at one zoom level, and the math that fits grids around
//! Web Mercator bounding boxes.

use super::{HALF_WORLD_WIDTH, MercBBox, tile_size, tiles_per_side};
use anyhow::{Result, ensure};
use itertools::Itertools;
use std::fmt;

/// An inclusive rectangle of tile coordinates at some zoom level.
///
/// Depending on context the coordinates are either global world-grid indices
/// or local indices into a fitted tile matrix; the struct itself does not
/// distinguish the two.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
	pub x_min: u32,
	pub y_min: u32,
	pub x_max: u32,
	pub y_max: u32,
}

impl TileGrid {
	/// Creates a new `TileGrid` with the specified inclusive bounds.
	///
	/// # Errors
	///
	/// Returns an error if the bounds are inverted.
	pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Result<TileGrid> {
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		Ok(TileGrid {
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	pub fn width(&self) -> u64 {
		(self.x_max - self.x_min + 1) as u64
	}

	pub fn height(&self) -> u64 {
		(self.y_max - self.y_min + 1) as u64
	}

	/// Number of tiles within the grid.
	pub fn count(&self) -> u64 {
		self.width() * self.height()
	}

	/// Tolerance in tile units for box edges that land on tile boundaries.
	///
	/// Edges within this distance of a boundary are treated as exactly on it,
	/// so that a grid converted to its extent and back yields the same grid
	/// despite float rounding. Far below any real-world coordinate precision.
	const BOUNDARY_SNAP: f64 = 1e-9;

	/// The inclusive range of world-grid tiles whose extents intersect the
	/// bounding box at the given zoom level.
	///
	/// A tile covers the half-open extent `[min, max)`; when a box edge falls
	/// exactly on a tile boundary, the lower tile wins, so adjacent boxes do
	/// not double-count the shared edge.
	pub fn from_merc_bbox(bbox: &MercBBox, zoom: u8) -> TileGrid {
		let max_index = (tiles_per_side(zoom) - 1) as i64;
		let size = tile_size(zoom);

		let x_min = ((bbox.0 + HALF_WORLD_WIDTH) / size + Self::BOUNDARY_SNAP).floor() as i64;
		let x_max = ((bbox.2 + HALF_WORLD_WIDTH) / size - Self::BOUNDARY_SNAP).floor() as i64;
		let y_min = ((HALF_WORLD_WIDTH - bbox.3) / size + Self::BOUNDARY_SNAP).floor() as i64;
		let y_max = ((HALF_WORLD_WIDTH - bbox.1) / size - Self::BOUNDARY_SNAP).floor() as i64;

		TileGrid {
			x_min: x_min.clamp(0, max_index) as u32,
			y_min: y_min.clamp(0, max_index) as u32,
			x_max: x_max.clamp(0, max_index) as u32,
			y_max: y_max.clamp(0, max_index) as u32,
		}
	}

	/// The inclusive cell range of a `matrix_width x matrix_height` division
	/// of `outer` that covers `request`, clamped into the matrix.
	///
	/// # Errors
	///
	/// Returns an error if `request` lies entirely outside `outer`.
	pub fn fitted(outer: &MercBBox, matrix_width: u64, matrix_height: u64, request: &MercBBox) -> Result<TileGrid> {
		let mut x_min = outer.tile_column(matrix_width, request.0);
		let mut x_max = outer.tile_column(matrix_width, request.2);
		if x_min < matrix_width as i64 && x_max >= 0 {
			x_min = x_min.max(0);
			x_max = x_max.min(matrix_width as i64 - 1);
		}

		let mut y_min = outer.tile_row(matrix_height, request.3);
		let mut y_max = outer.tile_row(matrix_height, request.1);
		if y_min < matrix_height as i64 && y_max >= 0 {
			y_min = y_min.max(0);
			y_max = y_max.min(matrix_height as i64 - 1);
		}

		ensure!(
			x_min <= x_max && y_min <= y_max && x_min >= 0 && y_min >= 0,
			"request bbox {request:?} does not intersect the tile matrix bbox {outer:?}"
		);

		TileGrid::new(x_min as u32, y_min as u32, x_max as u32, y_max as u32)
	}

	/// The exact Web Mercator extent of this grid of world-grid tiles.
	pub fn merc_bbox(&self, zoom: u8) -> MercBBox {
		let size = tile_size(zoom);
		MercBBox::new(
			-HALF_WORLD_WIDTH + self.x_min as f64 * size,
			HALF_WORLD_WIDTH - (self.y_max + 1) as f64 * size,
			-HALF_WORLD_WIDTH + (self.x_max + 1) as f64 * size,
			HALF_WORLD_WIDTH - self.y_min as f64 * size,
		)
	}

	/// Iterates all `(x, y)` coordinates of the grid in row-major order.
	pub fn iter_coords(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
		(self.y_min..=self.y_max)
			.cartesian_product(self.x_min..=self.x_max)
			.map(|(y, x)| (x, y))
	}
}

impl fmt::Debug for TileGrid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!(
			"[{},{},{},{}] ({})",
			&self.x_min,
			&self.y_min,
			&self.x_max,
			&self.y_max,
			&self.count()
		))
	}
}
