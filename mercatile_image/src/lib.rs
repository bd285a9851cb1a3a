//! Image probing and transcoding over opaque tile payloads.

pub mod format;
mod probe;

pub use format::*;
pub use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
pub use probe::*;
