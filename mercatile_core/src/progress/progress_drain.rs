use super::traits::ProgressSink;

/// A no-op progress sink that never cancels.
pub struct ProgressDrain {}

impl ProgressDrain {
	pub fn new() -> Self {
		Self {}
	}
}

impl Default for ProgressDrain {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressSink for ProgressDrain {
	fn set_max(&self, _max_value: u64) {}
	fn add_progress(&self, _value: u64) {}
	fn is_active(&self) -> bool {
		true
	}
	fn cleanup_on_cancel(&self) -> bool {
		false
	}
}
