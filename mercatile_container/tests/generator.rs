//! End-to-end tile generation scenarios against temporary GeoPackage files.

use anyhow::Result;
use assert_fs::NamedTempFile;
use async_trait::async_trait;
use mercatile_container::{GeneratorError, GeoPackage, TileGenerator, TileSource};
use mercatile_core::progress::ProgressSink;
use mercatile_core::{Blob, GeoBBox, HALF_WORLD_WIDTH, MercBBox};
use mercatile_image::{DynamicImage, Rgb, RgbImage, TileImageFormat, image2blob};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Returns the same 256x256 PNG for every tile.
struct PngSource;

fn png_tile() -> Blob {
	let image = DynamicImage::ImageRgb8(RgbImage::from_fn(256, 256, |x, y| Rgb([x as u8, y as u8, 128])));
	image2blob(TileImageFormat::Png, &image, None).unwrap()
}

#[async_trait]
impl TileSource for PngSource {
	async fn fetch(&self, _zoom: u8, _x: u32, _y: u32) -> Result<Option<Blob>> {
		Ok(Some(png_tile()))
	}
}

/// Returns bytes no image decoder accepts.
struct GarbageSource;

#[async_trait]
impl TileSource for GarbageSource {
	async fn fetch(&self, _zoom: u8, _x: u32, _y: u32) -> Result<Option<Blob>> {
		Ok(Some(Blob::from(vec![0xDEu8, 0xAD, 0xBE, 0xEF])))
	}
}

/// Cancels the run once enough progress has been reported.
struct CancellingSink {
	progressed: AtomicU64,
	cancel_after: u64,
}

impl CancellingSink {
	fn new(cancel_after: u64) -> CancellingSink {
		CancellingSink {
			progressed: AtomicU64::new(0),
			cancel_after,
		}
	}
}

impl ProgressSink for CancellingSink {
	fn set_max(&self, _max_value: u64) {}
	fn add_progress(&self, value: u64) {
		self.progressed.fetch_add(value, Ordering::SeqCst);
	}
	fn is_active(&self) -> bool {
		self.progressed.load(Ordering::SeqCst) < self.cancel_after
	}
	fn cleanup_on_cancel(&self) -> bool {
		true
	}
}

fn open_gpkg(name: &str) -> (NamedTempFile, GeoPackage) {
	let file = NamedTempFile::new(name).unwrap();
	let gpkg = GeoPackage::open(file.path()).unwrap();
	(file, gpkg)
}

fn world_merc() -> MercBBox {
	MercBBox::new(-HALF_WORLD_WIDTH, -HALF_WORLD_WIDTH, HALF_WORLD_WIDTH, HALF_WORLD_WIDTH)
}

fn assert_close(a: f64, b: f64, tolerance: f64) {
	assert!((a - b).abs() < tolerance, "{a} != {b} (tolerance {tolerance})");
}

/// Checks the pixel-size invariant of every tile matrix of a table.
fn assert_pixel_sizes(gpkg: &GeoPackage, table: &str, merc: &MercBBox) {
	let dao = gpkg.tile_dao(table);
	let min_zoom = dao.min_zoom().unwrap().unwrap();
	let max_zoom = dao.max_zoom().unwrap().unwrap();
	for zoom in min_zoom..=max_zoom {
		let Some(matrix) = dao.tile_matrix_at(zoom).unwrap() else {
			continue;
		};
		assert_close(
			matrix.pixel_x_size * matrix.matrix_width as f64 * matrix.tile_width as f64,
			merc.width(),
			1e-6,
		);
		assert_close(
			matrix.pixel_y_size * matrix.matrix_height as f64 * matrix.tile_height as f64,
			merc.height(),
			1e-6,
		);
	}
}

// S1: fresh google-format pyramid over the whole world
#[tokio::test]
async fn google_world_pyramid() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s1.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "world", Box::new(PngSource), 0, 1)?;
	generator.set_tile_bounding_box(GeoBBox::new(-180.0, -85.0511, 180.0, 85.0511))?;
	generator.set_google_tiles(true)?;
	assert_eq!(generator.tile_count(), 5);

	assert_eq!(generator.generate().await?, 5);

	let set = gpkg.tile_matrix_set_dao().query_for_id("world")?.unwrap();
	let world = world_merc();
	for (stored, expected) in set.bbox.iter().zip([world.0, world.1, world.2, world.3]) {
		assert_close(*stored, expected, 1.0);
	}

	let dao = gpkg.tile_dao("world");
	assert_eq!(dao.count(Some(0))?, 1);
	assert_eq!(dao.count(Some(1))?, 4);
	assert!(dao.query_tile(0, 0, 0)?.is_some());
	assert!(dao.query_tile(1, 1, 1)?.is_some());

	let matrix0 = dao.tile_matrix_at(0)?.unwrap();
	assert_eq!((matrix0.matrix_width, matrix0.matrix_height), (1, 1));
	assert_eq!((matrix0.tile_width, matrix0.tile_height), (256, 256));
	let matrix1 = dao.tile_matrix_at(1)?.unwrap();
	assert_eq!((matrix1.matrix_width, matrix1.matrix_height), (2, 2));

	assert!(dao.is_google_tiles(&set)?);
	assert_pixel_sizes(&gpkg, "world", &world);
	Ok(())
}

// S2: fresh GeoPackage-format pyramid fitted around a small bounding box
#[tokio::test]
async fn fitted_small_bbox() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s2.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "fitted", Box::new(PngSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
	assert_eq!(generator.tile_count(), 2);

	assert_eq!(generator.generate().await?, 2);

	let dao = gpkg.tile_dao("fitted");

	// the zoom 2 matrix is the single world tile containing the box,
	// doubling at zoom 3; stored coordinates are local to the fitted grid
	let matrix2 = dao.tile_matrix_at(2)?.unwrap();
	assert_eq!((matrix2.matrix_width, matrix2.matrix_height), (1, 1));
	let matrix3 = dao.tile_matrix_at(3)?.unwrap();
	assert_eq!((matrix3.matrix_width, matrix3.matrix_height), (2, 2));

	assert!(dao.query_tile(2, 0, 0)?.is_some());
	assert!(dao.query_tile(3, 0, 1)?.is_some());

	// the matrix set is the exact extent of world tile (2, 1) at zoom 2
	let set = gpkg.tile_matrix_set_dao().query_for_id("fitted")?.unwrap();
	let quarter = HALF_WORLD_WIDTH / 2.0;
	for (stored, expected) in set.bbox.iter().zip([0.0, 0.0, quarter, quarter]) {
		assert_close(*stored, expected, 1e-6);
	}
	assert!(!dao.is_google_tiles(&set)?);

	assert_pixel_sizes(&gpkg, "fitted", &MercBBox::new(0.0, 0.0, quarter, quarter));
	Ok(())
}

// S3: merging a larger request re-grids every stored tile without collisions
#[tokio::test]
async fn merge_relocates_stored_tiles() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s3.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "merge", Box::new(PngSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 50.0, 50.0))?;
	// zoom 2: one tile, zoom 3: four tiles
	assert_eq!(generator.generate().await?, 5);

	let dao = gpkg.tile_dao("merge");
	assert_eq!(dao.count(Some(3))?, 4);
	let old_set = gpkg.tile_matrix_set_dao().query_for_id("merge")?.unwrap();
	let old_outer = MercBBox::new(old_set.bbox[0], old_set.bbox[1], old_set.bbox[2], old_set.bbox[3]);
	let old_matrix3 = dao.tile_matrix_at(3)?.unwrap();

	// remember where the zoom 3 tiles sit before the merge
	let old_positions: Vec<(u64, u64)> = dao
		.query_positions_descending(3)?
		.iter()
		.map(|p| (p.column, p.row))
		.collect();
	assert_eq!(old_positions, vec![(1, 1), (1, 0), (0, 1), (0, 0)]);

	// merge a request extending the box west and south, regenerating only zoom 2
	let mut generator = TileGenerator::new(gpkg.clone(), "merge", Box::new(PngSource), 2, 2)?;
	generator.set_tile_bounding_box(GeoBBox::new(-50.0, -50.0, 50.0, 50.0))?;
	assert_eq!(generator.generate().await?, 4);

	// contents cover the union of both requests
	let contents = gpkg.contents_dao().query_for_id("merge")?.unwrap();
	let contents_bbox = GeoBBox::new(contents.bbox[0], contents.bbox[1], contents.bbox[2], contents.bbox[3]);
	assert!(contents_bbox.contains(&GeoBBox::new(5.0, 5.0, 50.0, 50.0)));
	assert!(contents_bbox.contains(&GeoBBox::new(-50.0, -50.0, 50.0, 50.0)));

	// the matrices doubled in both directions
	let matrix2 = dao.tile_matrix_at(2)?.unwrap();
	assert_eq!((matrix2.matrix_width, matrix2.matrix_height), (2, 2));
	let matrix3 = dao.tile_matrix_at(3)?.unwrap();
	assert_eq!((matrix3.matrix_width, matrix3.matrix_height), (4, 4));

	// zoom 3 was not regenerated: its four tiles moved to the new grid
	assert_eq!(dao.count(Some(3))?, 4);
	let new_positions: Vec<(u64, u64)> = dao
		.query_positions_descending(3)?
		.iter()
		.map(|p| (p.column, p.row))
		.collect();
	assert_eq!(new_positions, vec![(3, 1), (3, 0), (2, 1), (2, 0)]);
	assert_eq!(dao.query_tile(3, 2, 0)?.unwrap(), png_tile());

	// every relocated tile centroid still lies inside its new cell
	let new_set = gpkg.tile_matrix_set_dao().query_for_id("merge")?.unwrap();
	let new_outer = MercBBox::new(new_set.bbox[0], new_set.bbox[1], new_set.bbox[2], new_set.bbox[3]);
	for (old, new) in old_positions.iter().zip(&new_positions) {
		let old_cell = old_outer.cell_bbox(old_matrix3.matrix_width, old_matrix3.matrix_height, old.0, old.1);
		let new_cell = new_outer.cell_bbox(4, 4, new.0, new.1);
		assert!(new_cell.0 <= old_cell.mid_x() && old_cell.mid_x() < new_cell.2);
		assert!(new_cell.1 <= old_cell.mid_y() && old_cell.mid_y() < new_cell.3);
	}

	// zoom 2 was regenerated into the grown 2x2 matrix
	assert_eq!(dao.count(Some(2))?, 4);
	assert!(dao.query_tile(2, 0, 0)?.is_some());
	assert!(dao.query_tile(2, 1, 1)?.is_some());

	assert_pixel_sizes(&gpkg, "merge", &new_outer);
	Ok(())
}

// a merge whose minimum zoom lies above the stored one multiplies the
// generation dimensions after the relocation pass
#[tokio::test]
async fn merge_extends_only_deeper_zoom() -> Result<()> {
	let (_file, gpkg) = open_gpkg("deep.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "deep", Box::new(PngSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 50.0, 50.0))?;
	assert_eq!(generator.generate().await?, 5);

	let mut generator = TileGenerator::new(gpkg.clone(), "deep", Box::new(PngSource), 3, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(-50.0, -50.0, 50.0, 50.0))?;
	assert_eq!(generator.generate().await?, 16);

	let dao = gpkg.tile_dao("deep");
	let matrix3 = dao.tile_matrix_at(3)?.unwrap();
	assert_eq!((matrix3.matrix_width, matrix3.matrix_height), (4, 4));
	assert_eq!(dao.count(Some(3))?, 16);

	// zoom 2 was only relocated, never regenerated
	let matrix2 = dao.tile_matrix_at(2)?.unwrap();
	assert_eq!((matrix2.matrix_width, matrix2.matrix_height), (2, 2));
	assert_eq!(dao.count(Some(2))?, 1);
	assert!(dao.query_tile(2, 1, 0)?.is_some());
	Ok(())
}

// S4: cancellation with cleanup drops the table and reports zero tiles
#[tokio::test]
async fn cancellation_cleanup() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s4.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "cancelled", Box::new(PngSource), 0, 2)?;
	generator.set_google_tiles(true)?;
	generator.set_progress(Arc::new(CancellingSink::new(3)))?;

	assert_eq!(generator.generate().await?, 0);
	assert!(!gpkg.table_exists("cancelled")?);
	assert!(!gpkg.tile_matrix_set_dao().id_exists("cancelled")?);
	Ok(())
}

// S5: google tiles can not be added to a GeoPackage-format table
#[tokio::test]
async fn google_over_fitted_is_rejected() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s5.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "strict", Box::new(PngSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
	generator.generate().await?;

	let set_before = gpkg.tile_matrix_set_dao().query_for_id("strict")?.unwrap();
	let count_before = gpkg.tile_dao("strict").count(None)?;

	let mut generator = TileGenerator::new(gpkg.clone(), "strict", Box::new(PngSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
	generator.set_google_tiles(true)?;

	let err = generator.generate().await.unwrap_err();
	assert!(matches!(
		err.downcast_ref::<GeneratorError>(),
		Some(GeneratorError::FormatConflict { .. })
	));

	// the table is untouched
	assert!(gpkg.table_exists("strict")?);
	assert_eq!(gpkg.tile_matrix_set_dao().query_for_id("strict")?.unwrap(), set_before);
	assert_eq!(gpkg.tile_dao("strict").count(None)?, count_before);
	Ok(())
}

// the reverse direction upgrades the request silently
#[tokio::test]
async fn fitted_over_google_is_upgraded() -> Result<()> {
	let (_file, gpkg) = open_gpkg("upgrade.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "google", Box::new(PngSource), 1, 1)?;
	generator.set_google_tiles(true)?;
	assert_eq!(generator.generate().await?, 4);

	let mut generator = TileGenerator::new(gpkg.clone(), "google", Box::new(PngSource), 2, 2)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
	assert_eq!(generator.generate().await?, 1);

	// the new tile was stored at its global world-grid position
	let dao = gpkg.tile_dao("google");
	assert!(dao.query_tile(2, 2, 1)?.is_some());
	let matrix2 = dao.tile_matrix_at(2)?.unwrap();
	assert_eq!((matrix2.matrix_width, matrix2.matrix_height), (4, 4));

	let set = gpkg.tile_matrix_set_dao().query_for_id("google")?.unwrap();
	assert!(dao.is_google_tiles(&set)?);
	Ok(())
}

// S6: a source no decoder understands yields no tiles, no matrices, no error
#[tokio::test]
async fn undecodable_source_stores_nothing() -> Result<()> {
	let (_file, gpkg) = open_gpkg("s6.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "garbage", Box::new(GarbageSource), 2, 3)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;

	assert_eq!(generator.generate().await?, 0);

	let dao = gpkg.tile_dao("garbage");
	assert_eq!(dao.count(None)?, 0);
	assert!(dao.tile_matrix_at(2)?.is_none());
	assert!(dao.tile_matrix_at(3)?.is_none());
	assert!(dao.min_zoom()?.is_none());
	Ok(())
}

// property: regenerating with identical inputs yields the identical tile set
#[tokio::test]
async fn regeneration_is_idempotent() -> Result<()> {
	let (_file, gpkg) = open_gpkg("idem.gpkg");

	let run = || async {
		let mut generator = TileGenerator::new(gpkg.clone(), "stable", Box::new(PngSource), 2, 3)?;
		generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 50.0, 50.0))?;
		generator.generate().await
	};

	assert_eq!(run().await?, 5);

	let dao = gpkg.tile_dao("stable");
	let snapshot = |dao: &mercatile_container::gpkg::TileDao| -> Result<Vec<(u8, u64, u64, Vec<u8>)>> {
		let mut rows = Vec::new();
		for zoom in 2..=3u8 {
			for position in dao.query_positions_descending(zoom)? {
				let blob = dao.query_tile(zoom, position.column, position.row)?.unwrap();
				rows.push((zoom, position.column, position.row, blob.into_vec()));
			}
		}
		Ok(rows)
	};

	let first = snapshot(&dao)?;
	assert_eq!(run().await?, 5);
	let second = snapshot(&dao)?;
	assert_eq!(first, second);
	Ok(())
}

// contents timestamps only move forward across successful generations
#[tokio::test]
async fn last_change_is_monotonic() -> Result<()> {
	let (_file, gpkg) = open_gpkg("stamp.gpkg");

	let run = || async {
		let mut generator = TileGenerator::new(gpkg.clone(), "stamped", Box::new(PngSource), 2, 2)?;
		generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
		generator.generate().await
	};

	run().await?;
	let first = gpkg.contents_dao().query_for_id("stamped")?.unwrap().last_change;
	run().await?;
	let second = gpkg.contents_dao().query_for_id("stamped")?.unwrap().last_change;
	assert!(second >= first);
	Ok(())
}

// stored payloads are re-encoded when a compress format is configured
#[tokio::test]
async fn transcodes_on_store() -> Result<()> {
	let (_file, gpkg) = open_gpkg("jpeg.gpkg");

	let mut generator = TileGenerator::new(gpkg.clone(), "jpeg", Box::new(PngSource), 2, 2)?;
	generator.set_tile_bounding_box(GeoBBox::new(5.0, 5.0, 15.0, 15.0))?;
	generator.set_compress_format("jpeg")?;
	generator.set_compress_quality(0.8)?;

	assert_eq!(generator.generate().await?, 1);

	let blob = gpkg.tile_dao("jpeg").query_tile(2, 0, 0)?.unwrap();
	// JPEG magic, not the PNG the source returned
	assert_eq!(&blob.as_slice()[0..2], &[0xFF, 0xD8]);
	assert_eq!(mercatile_image::probe(&blob), Some((256, 256)));
	Ok(())
}
