//! Decoding helpers for opaque tile payloads.

use crate::format::{TileImageFormat, image2blob};
use anyhow::{Context, Result};
use image::DynamicImage;
use mercatile_core::Blob;

/// Pixel dimensions of an encoded image, or `None` when undecodable.
pub fn probe(blob: &Blob) -> Option<(u32, u32)> {
	image::load_from_memory(blob.as_slice())
		.ok()
		.map(|image| (image.width(), image.height()))
}

/// Decodes an encoded image, guessing the format from its bytes.
pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	image::load_from_memory(blob.as_slice()).context("failed to decode image")
}

/// Re-encodes an image payload in the given format.
///
/// `quality` is a fraction in `[0.0, 1.0]`; `None` uses the codec default.
pub fn transcode(blob: &Blob, format: TileImageFormat, quality: Option<f32>) -> Result<Blob> {
	let image = decode(blob)?;
	image2blob(format, &image, quality)
}
