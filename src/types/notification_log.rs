use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

/// Producer half handed to the link; receives raw notification payloads.
pub type NotificationSink = mpsc::UnboundedSender<Vec<u8>>;

/// Append-only record of status text pushed by the device during one session.
///
/// The link's notification listener writes raw bytes into a channel; the
/// session drains it while waiting, so there is exactly one producer and one
/// consumer and no shared lock.
pub struct NotificationLog {
	entries: Vec<String>,
	tx: NotificationSink,
	rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl NotificationLog {
	pub fn new() -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self {
			entries: Vec::new(),
			tx,
			rx,
		}
	}

	pub fn sink(&self) -> NotificationSink {
		self.tx.clone()
	}

	pub fn entries(&self) -> &[String] {
		&self.entries
	}

	/// Case-insensitive substring match against everything received so far.
	pub fn contains(&self, token: &str) -> bool {
		let token = token.to_lowercase();
		self.entries
			.iter()
			.any(|e| e.to_lowercase().contains(&token))
	}

	fn push_raw(&mut self, raw: &[u8]) {
		if let Some(text) = decode_notification(raw) {
			info!("device: {}", text.trim());
			self.entries.push(text);
		}
	}

	fn drain(&mut self) {
		while let Ok(raw) = self.rx.try_recv() {
			self.push_raw(&raw);
		}
	}

	/// Waits until `token` shows up in the log or `timeout` elapses.
	pub async fn wait_for(&mut self, token: &str, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		loop {
			self.drain();
			if self.contains(token) {
				return true;
			}
			match tokio::time::timeout_at(deadline, self.rx.recv()).await {
				Ok(Some(raw)) => self.push_raw(&raw),
				Ok(None) | Err(_) => return false,
			}
		}
	}
}

impl Default for NotificationLog {
	fn default() -> Self {
		Self::new()
	}
}

/// ASCII-decodes a payload, dropping non-ASCII bytes. Blank payloads yield `None`.
pub fn decode_notification(raw: &[u8]) -> Option<String> {
	let text: String = raw
		.iter()
		.filter(|b| b.is_ascii())
		.map(|&b| b as char)
		.collect();
	if text.trim().is_empty() {
		None
	} else {
		Some(text)
	}
}
