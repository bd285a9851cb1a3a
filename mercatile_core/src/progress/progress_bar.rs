//! Lightweight terminal progress bar without external dependencies.
//!
//! Renders message, position/length, percentage and a bar to stderr, rate
//! limited to a few redraws per second.

use super::traits::ProgressSink;
use std::io::{Write, stderr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 40;
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

struct Inner {
	message: String,
	len: u64,
	pos: u64,
	last_draw: Instant,
	finished: bool,
}

impl Inner {
	fn redraw(&mut self, force: bool) {
		if !force && self.last_draw.elapsed() < REDRAW_INTERVAL {
			return;
		}
		self.last_draw = Instant::now();

		let len = self.len.max(1);
		let pos = self.pos.min(len);
		let filled = (pos as usize * BAR_WIDTH) / len as usize;
		let percent = pos as f64 * 100.0 / len as f64;

		let mut handle = stderr().lock();
		let _ = write!(
			handle,
			"\r{}: [{}{}] {}/{} ({percent:.0}%)",
			self.message,
			"#".repeat(filled),
			"-".repeat(BAR_WIDTH - filled),
			pos,
			len,
		);
		let _ = handle.flush();
	}
}

/// A terminal progress sink, thread-safe via interior mutability.
pub struct ProgressBar {
	inner: Mutex<Inner>,
}

impl ProgressBar {
	pub fn new(message: &str) -> ProgressBar {
		ProgressBar {
			inner: Mutex::new(Inner {
				message: message.to_string(),
				len: 0,
				pos: 0,
				last_draw: Instant::now() - REDRAW_INTERVAL,
				finished: false,
			}),
		}
	}

	/// Current position, mainly for tests.
	pub fn position(&self) -> u64 {
		self.inner.lock().unwrap().pos
	}

	/// Prints a final newline and freezes the bar.
	pub fn finish(&self) {
		let mut inner = self.inner.lock().unwrap();
		inner.pos = inner.len;
		inner.finished = true;
		inner.redraw(true);
		eprintln!();
	}
}

impl ProgressSink for ProgressBar {
	fn set_max(&self, max_value: u64) {
		let mut inner = self.inner.lock().unwrap();
		inner.len = max_value;
		inner.redraw(true);
	}

	fn add_progress(&self, value: u64) {
		let mut inner = self.inner.lock().unwrap();
		let next = inner.pos.saturating_add(value);
		inner.pos = if inner.len == 0 { next } else { next.min(inner.len) };
		inner.redraw(false);
	}

	fn is_active(&self) -> bool {
		!self.inner.lock().unwrap().finished
	}

	fn cleanup_on_cancel(&self) -> bool {
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tracks_position() {
		let progress = ProgressBar::new("test");
		progress.set_max(100);
		progress.add_progress(10);
		progress.add_progress(20);
		assert_eq!(progress.position(), 30);
		assert!(progress.is_active());
		assert!(!progress.cleanup_on_cancel());
	}

	#[test]
	fn finish_deactivates() {
		let progress = ProgressBar::new("test");
		progress.set_max(10);
		progress.finish();
		assert!(!progress.is_active());
		assert_eq!(progress.position(), 10);
	}
}
