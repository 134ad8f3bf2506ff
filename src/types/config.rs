use std::fmt;
use std::time::Duration;

use crate::consts::{CHUNK_DELAY, DEFAULT_CHUNK_SIZE, DONE_TIMEOUT, READY_TIMEOUT};

/// Session tunables. `Default` matches the behaviour of the stock device app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
	pub chunk_size: usize,
	pub ready_timeout: Duration,
	pub done_timeout: Duration,
	/// Pause after every chunk write. The device has no backpressure, so
	/// dropping this below what it can absorb silently loses pixels.
	pub chunk_delay: Duration,
	pub reverse: bool,
}

impl Default for UploadConfig {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_CHUNK_SIZE,
			ready_timeout: READY_TIMEOUT,
			done_timeout: DONE_TIMEOUT,
			chunk_delay: CHUNK_DELAY,
			reverse: true,
		}
	}
}

impl fmt::Display for UploadConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "  chunk size:     {} bytes", self.chunk_size)?;
		writeln!(f, "  ready timeout:  {}s", self.ready_timeout.as_secs())?;
		writeln!(f, "  done timeout:   {}s", self.done_timeout.as_secs())?;
		writeln!(f, "  chunk delay:    {}ms", self.chunk_delay.as_millis())?;
		write!(f, "  reversed:       {}", self.reverse)
	}
}
