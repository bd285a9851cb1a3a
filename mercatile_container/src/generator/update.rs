//! The merge path: resolving the addressing scheme against an existing tile
//! table, growing the stored bounds and re-gridding every stored tile.

use super::TileGenerator;
use crate::{GeneratorError, gpkg::TileMatrixSet};
use anyhow::{Context, Result, bail, ensure};
use log::trace;
use mercatile_core::{bbox_from_wgs84, bbox_to_wgs84};

impl TileGenerator {
	/// Resolves the requested addressing scheme against the stored one.
	///
	/// GeoPackage-format requests against a google-format table are silently
	/// upgraded to google format. The reverse is a format conflict and fails
	/// before anything is mutated.
	pub(crate) fn resolve_format(&mut self, tile_matrix_set: &TileMatrixSet) -> Result<()> {
		let tile_dao = self.geopackage.tile_dao(&self.table_name);

		if tile_dao.is_google_tiles(tile_matrix_set)? {
			if !self.google_tiles {
				self.google_tiles = true;
				self.adjust_google_bounds();
			}
		} else if self.google_tiles {
			bail!(GeneratorError::FormatConflict {
				table: self.table_name.clone(),
			});
		}
		Ok(())
	}

	/// Grows the stored contents and matrix set bounds to cover this request
	/// and, for GeoPackage format, re-grids every stored tile into the new
	/// coordinate space.
	pub(crate) fn update_tile_bounds(&mut self, tile_matrix_set: &TileMatrixSet) -> Result<()> {
		let contents_dao = self.geopackage.contents_dao();
		let mut contents = contents_dao
			.query_for_id(&self.table_name)?
			.with_context(|| format!("missing contents for \"{}\"", self.table_name))?;

		// combine the stored and requested bounds
		let contents_bbox = bbox_to_wgs84(contents.bbox, contents.srs_id)?;
		self.bounding_box = contents_bbox.extended(&self.bounding_box);
		if contents_bbox != self.bounding_box {
			contents.bbox = bbox_from_wgs84(&self.bounding_box, contents.srs_id)?;
			contents_dao.update(&contents)?;
		}

		// google tiles stay on the world grid, nothing to re-grid
		if self.google_tiles {
			return Ok(());
		}

		let tile_dao = self.geopackage.tile_dao(&self.table_name);
		let previous_set_bbox = bbox_to_wgs84(tile_matrix_set.bbox, tile_matrix_set.srs_id)?;

		// refit the matrix set around the combined bounds, at the lowest zoom
		// level that is either stored or requested
		let total_merc = self.bounding_box.to_mercator();
		let existing_min_zoom = tile_dao.min_zoom()?.unwrap_or(self.min_zoom);
		let min_new_or_update_zoom = self.min_zoom.min(existing_min_zoom);
		self.adjust_fitted_bounds(&total_merc, min_new_or_update_zoom);

		if previous_set_bbox != self.tile_matrix_set_bbox {
			self.geopackage.tile_matrix_set_dao().update(&TileMatrixSet {
				table_name: tile_matrix_set.table_name.clone(),
				srs_id: tile_matrix_set.srs_id,
				bbox: bbox_from_wgs84(&self.tile_matrix_set_bbox, tile_matrix_set.srs_id)?,
			})?;
		}

		let previous_set_merc = previous_set_bbox.to_mercator();
		let new_set_merc = self.tile_matrix_set_bbox.to_mercator();
		let tile_matrix_dao = self.geopackage.tile_matrix_dao();

		// re-grid the tile rows and matrix of every stored zoom level
		if let (Some(min_zoom), Some(max_zoom)) = (tile_dao.min_zoom()?, tile_dao.max_zoom()?) {
			for zoom in min_zoom..=max_zoom {
				let Some(mut tile_matrix) = tile_dao.tile_matrix_at(zoom)? else {
					continue;
				};

				let adjustment = 2u64.pow((zoom - min_new_or_update_zoom) as u32);
				let zoom_matrix_width = self.matrix_width * adjustment;
				let zoom_matrix_height = self.matrix_height * adjustment;
				trace!("re-grid zoom {zoom} into a {zoom_matrix_width}x{zoom_matrix_height} matrix");

				// the descending scan is load-bearing: the grown bounds only
				// shift tiles toward higher indices, so rewriting from the
				// highest (column, row) downward never hits the unique key of
				// a row still waiting to move
				for position in tile_dao.query_positions_descending(zoom)? {
					let tile_bbox = previous_set_merc.cell_bbox(
						tile_matrix.matrix_width,
						tile_matrix.matrix_height,
						position.column,
						position.row,
					);

					let new_column = new_set_merc.tile_column(zoom_matrix_width, tile_bbox.mid_x());
					let new_row = new_set_merc.tile_row(zoom_matrix_height, tile_bbox.mid_y());
					ensure!(
						new_column >= 0
							&& (new_column as u64) < zoom_matrix_width
							&& new_row >= 0 && (new_row as u64) < zoom_matrix_height,
						"tile ({}, {}) at zoom {zoom} fell outside the grown matrix",
						position.column,
						position.row
					);

					tile_dao.update_position(position.id, new_column as u64, new_row as u64)?;
				}

				tile_matrix.matrix_width = zoom_matrix_width;
				tile_matrix.matrix_height = zoom_matrix_height;
				tile_matrix.pixel_x_size = self.merc_bbox.width() / zoom_matrix_width as f64 / tile_matrix.tile_width as f64;
				tile_matrix.pixel_y_size =
					self.merc_bbox.height() / zoom_matrix_height as f64 / tile_matrix.tile_height as f64;
				tile_matrix_dao.update(&tile_matrix)?;
			}
		}

		// strict '<': when the stored and requested minimum zoom coincide the
		// dimensions already describe the generation start level
		if min_new_or_update_zoom < self.min_zoom {
			let adjustment = 2u64.pow((self.min_zoom - min_new_or_update_zoom) as u32);
			self.matrix_width *= adjustment;
			self.matrix_height *= adjustment;
		}

		Ok(())
	}
}
