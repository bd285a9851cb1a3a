mod jpeg;
mod png;
mod webp;

use anyhow::{Result, bail, ensure};
use image::DynamicImage;
use mercatile_core::Blob;
use std::fmt;
use std::str::FromStr;

/// Compressed raster formats a tile can be transcoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileImageFormat {
	Jpeg,
	Png,
	Webp,
}

impl FromStr for TileImageFormat {
	type Err = anyhow::Error;

	fn from_str(value: &str) -> Result<Self> {
		Ok(match value.to_ascii_lowercase().as_str() {
			"jpeg" | "jpg" => TileImageFormat::Jpeg,
			"png" => TileImageFormat::Png,
			"webp" => TileImageFormat::Webp,
			_ => bail!("unsupported image format \"{value}\""),
		})
	}
}

impl fmt::Display for TileImageFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			TileImageFormat::Jpeg => "jpeg",
			TileImageFormat::Png => "png",
			TileImageFormat::Webp => "webp",
		})
	}
}

/// Encodes an image in the given format.
///
/// `quality` is a fraction in `[0.0, 1.0]`; `None` uses the codec default.
/// Lossless codecs ignore it.
pub fn image2blob(format: TileImageFormat, image: &DynamicImage, quality: Option<f32>) -> Result<Blob> {
	if let Some(quality) = quality {
		ensure!(
			(0.0..=1.0).contains(&quality),
			"compress quality must be between 0.0 and 1.0, not {quality}"
		);
	}
	match format {
		TileImageFormat::Jpeg => jpeg::image2blob(image, quality),
		TileImageFormat::Png => png::image2blob(image),
		TileImageFormat::Webp => webp::image2blob(image, quality),
	}
}
