use thiserror::Error;

/// Classified tile generation failures.
///
/// Everything else surfaces as a plain [`anyhow::Error`]; these variants are
/// the ones callers are expected to branch on.
#[derive(Debug, Error)]
pub enum GeneratorError {
	/// A configuration value was rejected before generation started.
	#[error("compress quality must be between 0.0 and 1.0, not {0}")]
	InvalidCompressQuality(f32),

	/// The requested compress format name is not a known image format.
	#[error("unsupported compress format \"{0}\"")]
	UnsupportedFormat(String),

	/// Google formatted tiles cannot be added to a table holding
	/// GeoPackage formatted tiles.
	#[error("can not add google formatted tiles to \"{table}\" which already contains geopackage formatted tiles")]
	FormatConflict { table: String },

	/// Configuration setters are rejected once generation has begun.
	#[error("configuration can not change once tile generation has started")]
	ConfigurationFrozen,
}
