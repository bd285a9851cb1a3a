//! This module provides the `TileGenerator` struct, the public entry point
//! for writing a tile pyramid into a GeoPackage.
//!
//! A generator is configured first (bounding box, compression, addressing
//! scheme, progress sink) and then run once or repeatedly via
//! [`TileGenerator::generate`]. Tiles come from a caller-supplied
//! [`TileSource`] and are addressed either in google format (global world
//! grid) or in GeoPackage format (a matrix fitted around the bounding box).

use crate::{
	GeneratorError, TileSource,
	gpkg::{GeoPackage, TileDao, TileMatrix, TileMatrixDao, TileMatrixSet, check_table_name},
};
use anyhow::{Context, Result, bail, ensure};
use chrono::Utc;
use log::{trace, warn};
use mercatile_core::{GeoBBox, MercBBox, TileGrid, bbox_to_wgs84, progress::ProgressSink, tiles_per_side};
use mercatile_image::TileImageFormat;
use std::collections::HashMap;
use std::sync::Arc;

pub struct TileGenerator {
	pub(crate) geopackage: GeoPackage,
	pub(crate) table_name: String,
	source: Box<dyn TileSource>,
	pub(crate) min_zoom: u8,
	pub(crate) max_zoom: u8,

	// configuration
	pub(crate) bounding_box: GeoBBox,
	compress_format: Option<TileImageFormat>,
	compress_quality: Option<f32>,
	progress: Option<Arc<dyn ProgressSink>>,
	pub(crate) google_tiles: bool,
	started: bool,

	// generation state
	tile_count: Option<u64>,
	tile_grids: HashMap<u8, TileGrid>,
	pub(crate) tile_matrix_set_bbox: GeoBBox,
	pub(crate) merc_bbox: MercBBox,
	pub(crate) matrix_width: u64,
	pub(crate) matrix_height: u64,
}

impl TileGenerator {
	/// Creates a generator for one tile table and zoom range.
	///
	/// The bounding box defaults to the full world; configure it with
	/// [`TileGenerator::set_tile_bounding_box`] before generating.
	pub fn new(
		geopackage: GeoPackage,
		table_name: &str,
		source: Box<dyn TileSource>,
		min_zoom: u8,
		max_zoom: u8,
	) -> Result<TileGenerator> {
		check_table_name(table_name)?;
		ensure!(min_zoom <= max_zoom, "min zoom ({min_zoom}) must be <= max zoom ({max_zoom})");
		ensure!(max_zoom <= 31, "max zoom ({max_zoom}) must be <= 31");

		let bounding_box = GeoBBox::full_world();
		Ok(TileGenerator {
			geopackage,
			table_name: table_name.to_string(),
			source,
			min_zoom,
			max_zoom,
			bounding_box,
			compress_format: None,
			compress_quality: None,
			progress: None,
			google_tiles: false,
			started: false,
			tile_count: None,
			tile_grids: HashMap::new(),
			tile_matrix_set_bbox: bounding_box,
			merc_bbox: bounding_box.to_mercator(),
			matrix_width: 0,
			matrix_height: 0,
		})
	}

	/// Sets the tile bounding box in WGS84. Latitudes are clamped to the
	/// Mercator-representable range.
	pub fn set_tile_bounding_box(&mut self, bounding_box: GeoBBox) -> Result<()> {
		self.ensure_not_started()?;
		bounding_box.check()?;
		self.bounding_box = bounding_box.clamped_to_mercator_lat();
		self.tile_count = None;
		self.tile_grids.clear();
		Ok(())
	}

	/// Sets the tile bounding box specified in the given CRS.
	pub fn set_tile_bounding_box_in_crs(&mut self, bounding_box: [f64; 4], epsg: i64) -> Result<()> {
		self.set_tile_bounding_box(bbox_to_wgs84(bounding_box, epsg)?)
	}

	pub fn tile_bounding_box(&self) -> &GeoBBox {
		&self.bounding_box
	}

	/// Requests re-encoding of every stored tile in the named format
	/// ("jpeg", "png" or "webp").
	pub fn set_compress_format(&mut self, format: &str) -> Result<()> {
		self.ensure_not_started()?;
		self.compress_format = Some(
			format
				.parse::<TileImageFormat>()
				.map_err(|_| GeneratorError::UnsupportedFormat(format.to_string()))?,
		);
		Ok(())
	}

	pub fn compress_format(&self) -> Option<TileImageFormat> {
		self.compress_format
	}

	/// Sets the re-encoding quality, a fraction in `[0.0, 1.0]`. Only used
	/// when a compress format is set.
	pub fn set_compress_quality(&mut self, quality: f32) -> Result<()> {
		self.ensure_not_started()?;
		if !(0.0..=1.0).contains(&quality) {
			bail!(GeneratorError::InvalidCompressQuality(quality));
		}
		self.compress_quality = Some(quality);
		Ok(())
	}

	pub fn compress_quality(&self) -> Option<f32> {
		self.compress_quality
	}

	/// Selects google addressing: tile (column, row) equal the global world
	/// grid (x, y). Default is GeoPackage addressing, where they are local
	/// offsets into a matrix fitted around the bounding box.
	pub fn set_google_tiles(&mut self, google_tiles: bool) -> Result<()> {
		self.ensure_not_started()?;
		self.google_tiles = google_tiles;
		Ok(())
	}

	pub fn is_google_tiles(&self) -> bool {
		self.google_tiles
	}

	pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) -> Result<()> {
		self.ensure_not_started()?;
		self.progress = Some(progress);
		Ok(())
	}

	pub fn progress(&self) -> Option<&Arc<dyn ProgressSink>> {
		self.progress.as_ref()
	}

	pub fn min_zoom(&self) -> u8 {
		self.min_zoom
	}

	pub fn max_zoom(&self) -> u8 {
		self.max_zoom
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	fn ensure_not_started(&self) -> Result<()> {
		if self.started {
			bail!(GeneratorError::ConfigurationFrozen);
		}
		Ok(())
	}

	/// Total number of tiles the configured request covers, computed lazily
	/// and cached together with the per-zoom tile grids.
	pub fn tile_count(&mut self) -> u64 {
		if self.tile_count.is_none() {
			let request_merc = self.bounding_box.to_mercator();
			let mut count = 0u64;
			for zoom in self.min_zoom..=self.max_zoom {
				let grid = TileGrid::from_merc_bbox(&request_merc, zoom);
				count += grid.count();
				self.tile_grids.insert(zoom, grid);
			}
			self.tile_count = Some(count);
		}
		self.tile_count.unwrap()
	}

	/// Generates the tile pyramid, returning the number of tiles committed.
	///
	/// Creates the tile table on first use; otherwise merges this request
	/// into the stored tile set, growing its bounds and re-gridding stored
	/// tiles as needed. On a fatal error from the relocation pass onward the
	/// target table is dropped before the error propagates. A cancelled run
	/// returns the committed count, or zero after dropping the table when the
	/// progress sink asks for cleanup.
	pub async fn generate(&mut self) -> Result<u64> {
		self.started = true;

		let total = self.tile_count();
		if let Some(progress) = &self.progress {
			progress.set_max(total);
		}
		trace!("generate {} tiles into \"{}\"", total, self.table_name);

		let request_merc = self.bounding_box.to_mercator();
		self.adjust_bounds(&request_merc, self.min_zoom);

		let set_dao = self.geopackage.tile_matrix_set_dao();
		let mut update = false;
		let tile_matrix_set = if !set_dao.table_exists()? || !set_dao.id_exists(&self.table_name)? {
			self.geopackage
				.create_tile_table_with_metadata(&self.table_name, &self.bounding_box, &self.merc_bbox)?
		} else {
			update = true;
			let set = set_dao
				.query_for_id(&self.table_name)?
				.with_context(|| format!("missing tile matrix set for \"{}\"", self.table_name))?;
			// a format conflict fails here, before anything is mutated
			self.resolve_format(&set)?;
			set
		};

		match self.run_generation(&tile_matrix_set, &request_merc, update).await {
			Ok(count) => Ok(count),
			Err(e) => {
				// single compensating action for every fatal exit
				self.geopackage.delete_table_quietly(&self.table_name);
				Err(e)
			}
		}
	}

	async fn run_generation(
		&mut self,
		tile_matrix_set: &TileMatrixSet,
		request_merc: &MercBBox,
		update: bool,
	) -> Result<u64> {
		if update {
			self.update_tile_bounds(tile_matrix_set)?;
		}

		let tile_dao = self.geopackage.tile_dao(&self.table_name);
		let tile_matrix_dao = self.geopackage.tile_matrix_dao();

		let mut count = 0u64;
		for zoom in self.min_zoom..=self.max_zoom {
			if !self.is_active() {
				break;
			}

			let local_grid = if self.google_tiles {
				self.matrix_width = tiles_per_side(zoom) as u64;
				self.matrix_height = self.matrix_width;
				None
			} else {
				Some(TileGrid::fitted(
					&self.merc_bbox,
					self.matrix_width,
					self.matrix_height,
					request_merc,
				)?)
			};

			let grid = *self
				.tile_grids
				.get(&zoom)
				.context("tile grids must be planned before generation")?;

			count += self
				.generate_zoom(
					&tile_matrix_dao,
					&tile_dao,
					zoom,
					&grid,
					local_grid.as_ref(),
					self.matrix_width,
					self.matrix_height,
					update,
				)
				.await?;

			if !self.google_tiles {
				// the fitted matrix doubles per level
				self.matrix_width *= 2;
				self.matrix_height *= 2;
			}
		}

		if !self.is_active() && self.cleanup_on_cancel() {
			self.geopackage.delete_table_quietly(&self.table_name);
			return Ok(0);
		}

		let contents_dao = self.geopackage.contents_dao();
		let mut contents = contents_dao
			.query_for_id(&self.table_name)?
			.with_context(|| format!("missing contents for \"{}\"", self.table_name))?;
		contents.last_change = Utc::now();
		contents_dao.update(&contents)?;

		Ok(count)
	}

	#[allow(clippy::too_many_arguments)]
	async fn generate_zoom(
		&self,
		tile_matrix_dao: &TileMatrixDao,
		tile_dao: &TileDao,
		zoom: u8,
		grid: &TileGrid,
		local_grid: Option<&TileGrid>,
		matrix_width: u64,
		matrix_height: u64,
		update: bool,
	) -> Result<u64> {
		let mut count = 0u64;
		let mut tile_dims: Option<(u32, u32)> = None;

		// stored coordinates of the grid corners, for the cleanup below
		let (column_min, row_min) = map_position(grid.x_min, grid.y_min, grid, local_grid);
		let (column_max, row_max) = map_position(grid.x_max, grid.y_max, grid, local_grid);

		for x in grid.x_min..=grid.x_max {
			if !self.is_active() {
				break;
			}
			for y in grid.y_min..=grid.y_max {
				if !self.is_active() {
					break;
				}

				let (column, row) = map_position(x, y, grid, local_grid);
				match self
					.produce_tile(tile_dao, zoom, x, y, column, row, update, &mut tile_dims)
					.await
				{
					Ok(true) => count += 1,
					Ok(false) => {}
					Err(e) => {
						// per-tile failures are skipped, the zoom level continues
						warn!("failed to create tile at zoom {zoom}, x {x}, y {y}: {e:#}");
					}
				}

				if let Some(progress) = &self.progress {
					progress.add_progress(1);
				}
			}
		}

		match tile_dims {
			None => {
				// no payload of this level was decodable, so the matrix can
				// not be sized; remove whatever was stored
				count = 0;
				tile_dao.delete_zoom_range(zoom, column_min, row_min, column_max, row_max)?;
			}
			Some((tile_width, tile_height)) => {
				let create = !update || !tile_matrix_dao.id_exists(&self.table_name, zoom)?;
				if create {
					tile_matrix_dao.create(&TileMatrix {
						table_name: self.table_name.clone(),
						zoom_level: zoom,
						matrix_width,
						matrix_height,
						tile_width,
						tile_height,
						pixel_x_size: self.merc_bbox.width() / matrix_width as f64 / tile_width as f64,
						pixel_y_size: self.merc_bbox.height() / matrix_height as f64 / tile_height as f64,
					})?;
				}
			}
		}

		Ok(count)
	}

	#[allow(clippy::too_many_arguments)]
	async fn produce_tile(
		&self,
		tile_dao: &TileDao,
		zoom: u8,
		x: u32,
		y: u32,
		column: u64,
		row: u64,
		update: bool,
		tile_dims: &mut Option<(u32, u32)>,
	) -> Result<bool> {
		if update {
			tile_dao.delete_tile(zoom, column, row)?;
		}

		let Some(mut bytes) = self.source.fetch(zoom, x, y).await? else {
			return Ok(false);
		};

		let mut image = None;
		if let Some(format) = self.compress_format {
			// undecodable payloads are stored as-is; the end-of-zoom check
			// removes them when no tile of the level was decodable
			if let Ok(decoded) = mercatile_image::decode(&bytes) {
				bytes = mercatile_image::image2blob(format, &decoded, self.compress_quality)?;
				image = Some(decoded);
			}
		}

		tile_dao.insert(zoom, column, row, &bytes)?;

		if tile_dims.is_none() {
			*tile_dims = match &image {
				Some(decoded) => Some((decoded.width(), decoded.height())),
				None => mercatile_image::probe(&bytes),
			};
		}

		Ok(true)
	}

	pub(crate) fn adjust_bounds(&mut self, request_merc: &MercBBox, zoom: u8) {
		if self.google_tiles {
			self.adjust_google_bounds();
		} else {
			self.adjust_fitted_bounds(request_merc, zoom);
		}
	}

	/// Google format: the matrix set is the whole world.
	pub(crate) fn adjust_google_bounds(&mut self) {
		self.tile_matrix_set_bbox = GeoBBox::full_world();
		self.merc_bbox = self.tile_matrix_set_bbox.to_mercator();
	}

	/// GeoPackage format: fit a tile grid around the request at the given
	/// zoom; its exact extent becomes the matrix set bounding box.
	pub(crate) fn adjust_fitted_bounds(&mut self, request_merc: &MercBBox, zoom: u8) {
		let grid = TileGrid::from_merc_bbox(request_merc, zoom);
		self.merc_bbox = grid.merc_bbox(zoom);
		self.tile_matrix_set_bbox = self.merc_bbox.to_geo();
		self.matrix_width = grid.width();
		self.matrix_height = grid.height();
	}

	pub(crate) fn is_active(&self) -> bool {
		self.progress.as_ref().map_or(true, |p| p.is_active())
	}

	fn cleanup_on_cancel(&self) -> bool {
		self.progress.as_ref().map_or(false, |p| p.cleanup_on_cancel())
	}
}

/// Maps a global grid position to its stored coordinates: unchanged in google
/// format, offset into the local grid in GeoPackage format.
fn map_position(x: u32, y: u32, grid: &TileGrid, local_grid: Option<&TileGrid>) -> (u64, u64) {
	match local_grid {
		Some(local) => (
			(x - grid.x_min + local.x_min) as u64,
			(y - grid.y_min + local.y_min) as u64,
		),
		None => (x as u64, y as u64),
	}
}
