//! This module provides the `ProgressSink` trait, the observer interface the
//! tile generator reports to and polls for cooperative cancellation.

/// Observer for long-running tile generation.
///
/// Implementations must use interior mutability; the generator shares one sink
/// across the whole run and polls `is_active` between tiles and zoom levels.
pub trait ProgressSink: Send + Sync {
	/// Announces the total number of work items.
	fn set_max(&self, max_value: u64);

	/// Advances the progress by the given amount.
	fn add_progress(&self, value: u64);

	/// Returns `false` to request cooperative cancellation.
	fn is_active(&self) -> bool;

	/// Whether a cancelled run should drop everything it has written.
	fn cleanup_on_cancel(&self) -> bool;
}
