use anyhow::{Result, anyhow, bail};
use image::DynamicImage;
use mercatile_core::Blob;
use webp::Encoder;

const DEFAULT_QUALITY: f32 = 95.0;

pub fn image2blob(image: &DynamicImage, quality: Option<f32>) -> Result<Blob> {
	match image.color() {
		image::ColorType::Rgb8 | image::ColorType::Rgba8 => {}
		_ => bail!("webp lossy encoding only supports 8 bit RGB/RGBA"),
	}

	let quality = match quality {
		Some(fraction) => (fraction * 100.0).clamp(1.0, 100.0),
		None => DEFAULT_QUALITY,
	};

	let encoder = Encoder::from_image(image).map_err(|e| anyhow!("webp encoding failed: {e}"))?;
	Ok(Blob::from(encoder.encode(quality).to_vec()))
}
