//! The contract between the generator and whatever produces raw tile bytes.

use anyhow::Result;
use async_trait::async_trait;
use mercatile_core::Blob;

/// Supplies raw tile payloads, e.g. an HTTP downloader or a local renderer.
///
/// Coordinates are always global Web Mercator tile indices, regardless of the
/// addressing scheme tiles are stored under.
#[async_trait]
pub trait TileSource: Send + Sync {
	/// Returns the encoded tile at `(zoom, x, y)`, or `None` if the source has
	/// no tile there.
	async fn fetch(&self, zoom: u8, x: u32, y: u32) -> Result<Option<Blob>>;
}
