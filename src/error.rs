use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::consts::CHAR_UUID;

/// Everything that can stop an upload attempt.
///
/// A missing "done" acknowledgement is deliberately absent: the session
/// reports it as [`crate::types::UploadOutcome::Unconfirmed`] instead.
#[derive(Debug, Error)]
pub enum UploadError {
	#[error("file not found: {}", .0.display())]
	FileNotFound(PathBuf),

	#[error("unsupported file format: {0} (supported: png, jpg, jpeg)")]
	UnsupportedFormat(String),

	#[error("failed to read image: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to decode image: {0}")]
	Decode(#[from] image::ImageError),

	#[error("chunk size must be between 1 and 255, got {0}")]
	InvalidChunkSize(usize),

	#[error("no Bluetooth adapter available")]
	NoAdapter,

	/// Scan window elapsed without a matching advertisement.
	#[error("Smart Sketch not found. Is it powered on, in range and not connected to another device?")]
	DeviceNotFound,

	#[error("connection failed: {0}")]
	ConnectionFailed(String),

	#[error("device does not expose characteristic {CHAR_UUID}")]
	CharacteristicMissing,

	/// No "OK" after the image command. Nothing was uploaded.
	#[error("device did not acknowledge the image command within {}s", .0.as_secs())]
	ReadyTimeout(Duration),

	#[error(transparent)]
	Transport(#[from] btleplug::Error),
}
