use anyhow::Result;
use image::{
	DynamicImage, ImageEncoder,
	codecs::png::{CompressionType, FilterType, PngEncoder},
};
use mercatile_core::Blob;

pub fn image2blob(image: &DynamicImage) -> Result<Blob> {
	let mut buffer: Vec<u8> = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::decode;
	use image::{Luma, GrayImage, Rgb, RgbImage};

	#[test]
	fn lossless_round_trip() {
		let image = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8, y as u8, 7])));
		let decoded = decode(&image2blob(&image).unwrap()).unwrap();
		assert_eq!(decoded.to_rgb8().as_raw(), image.to_rgb8().as_raw());
	}

	#[test]
	fn encodes_grayscale() {
		let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([42])));
		assert!(!image2blob(&image).unwrap().is_empty());
	}
}
