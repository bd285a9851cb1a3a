pub mod progress_bar;
pub mod progress_drain;
pub mod traits;

pub use progress_bar::ProgressBar;
pub use progress_drain::ProgressDrain;
pub use traits::ProgressSink;
