use anyhow::{Result, bail};
use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use mercatile_core::Blob;

const DEFAULT_QUALITY: u8 = 95;

pub fn image2blob(image: &DynamicImage, quality: Option<f32>) -> Result<Blob> {
	let color = image.color();
	if color.has_alpha() {
		bail!("jpeg does not support alpha channels");
	}

	let quality = match quality {
		Some(fraction) => (fraction * 100.0).round().clamp(1.0, 100.0) as u8,
		None => DEFAULT_QUALITY,
	};

	let mut buffer: Vec<u8> = Vec::new();
	JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		color.into(),
	)?;

	Ok(Blob::from(buffer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Rgb, RgbImage, Rgba, RgbaImage};
	use rstest::rstest;

	#[rstest]
	#[case::default(None)]
	#[case::low(Some(0.1))]
	#[case::high(Some(1.0))]
	fn encodes_rgb(#[case] quality: Option<f32>) {
		let image = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, _| Rgb([x as u8, 0, 0])));
		let blob = image2blob(&image, quality).unwrap();
		assert!(!blob.is_empty());
	}

	#[test]
	fn rejects_alpha() {
		let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 4])));
		assert!(image2blob(&image, None).is_err());
	}
}
