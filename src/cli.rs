use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::consts::*;
use crate::device::Target;
use crate::types::UploadConfig;

#[derive(Parser)]
#[command(
	name = "sketch-upload",
	about = "Upload a PNG or JPEG image to a Smart Sketch projector over Bluetooth LE"
)]
pub struct Cli {
	#[arg(help = "Image file to upload (png, jpg, jpeg)")]
	pub image: PathBuf,

	#[arg(
		short,
		long,
		help = "Connect to this device address instead of matching by name"
	)]
	pub address: Option<String>,

	#[arg(long, help = "Save a preview PNG of the device frame instead of uploading")]
	pub preview: Option<PathBuf>,

	#[arg(
		long,
		default_value_t = DEFAULT_CHUNK_SIZE as u8,
		value_parser = clap::value_parser!(u8).range(1..),
		help = "Bytes per characteristic write (1-255)"
	)]
	pub chunk_size: u8,

	#[arg(long, default_value_t = SCAN_TIMEOUT.as_secs(), help = "Seconds to scan for the device")]
	pub scan_timeout: u64,

	#[arg(long, default_value_t = READY_TIMEOUT.as_secs(), help = "Seconds to wait for the device to accept the image")]
	pub ready_timeout: u64,

	#[arg(long, default_value_t = DONE_TIMEOUT.as_secs(), help = "Seconds to wait for the device to confirm the image")]
	pub done_timeout: u64,

	#[arg(long, default_value_t = CHUNK_DELAY.as_millis() as u64, help = "Milliseconds to pause after each chunk")]
	pub chunk_delay: u64,

	#[arg(long, help = "Send pixel data in natural order (the image shows up flipped)")]
	pub no_reverse: bool,

	#[arg(short, long, help = "Enable debug logging")]
	pub verbose: bool,
}

impl Cli {
	pub fn target(&self) -> Target {
		match &self.address {
			Some(addr) => Target::Address(addr.clone()),
			None => Target::NamePattern,
		}
	}

	pub fn scan_duration(&self) -> Duration {
		Duration::from_secs(self.scan_timeout)
	}

	pub fn upload_config(&self) -> UploadConfig {
		UploadConfig {
			chunk_size: usize::from(self.chunk_size),
			ready_timeout: Duration::from_secs(self.ready_timeout),
			done_timeout: Duration::from_secs(self.done_timeout),
			chunk_delay: Duration::from_millis(self.chunk_delay),
			reverse: !self.no_reverse,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn command_is_well_formed() {
		Cli::command().debug_assert();
	}

	#[test]
	fn defaults_match_reference_behaviour() {
		let cli = Cli::try_parse_from(["sketch-upload", "photo.jpg"]).unwrap();
		assert_eq!(cli.image, PathBuf::from("photo.jpg"));
		assert_eq!(cli.target(), Target::NamePattern);
		assert_eq!(cli.scan_duration(), SCAN_TIMEOUT);
		assert_eq!(cli.upload_config(), UploadConfig::default());
	}

	#[test]
	fn flags_override_config() {
		let cli = Cli::try_parse_from([
			"sketch-upload",
			"img.png",
			"--address",
			"AA:BB:CC:DD:EE:FF",
			"--chunk-size",
			"128",
			"--ready-timeout",
			"3",
			"--chunk-delay",
			"0",
			"--no-reverse",
		])
		.unwrap();

		assert_eq!(cli.target(), Target::Address("AA:BB:CC:DD:EE:FF".into()));
		let config = cli.upload_config();
		assert_eq!(config.chunk_size, 128);
		assert_eq!(config.ready_timeout, Duration::from_secs(3));
		assert_eq!(config.done_timeout, DONE_TIMEOUT);
		assert_eq!(config.chunk_delay, Duration::ZERO);
		assert!(!config.reverse);
	}

	#[test]
	fn chunk_size_out_of_range_is_rejected_at_parse() {
		for bad in ["0", "256", "300", "-1"] {
			assert!(
				Cli::try_parse_from(["sketch-upload", "img.png", "--chunk-size", bad]).is_err(),
				"--chunk-size {bad} accepted"
			);
		}
		let cli = Cli::try_parse_from(["sketch-upload", "img.png", "--chunk-size", "255"]).unwrap();
		assert_eq!(cli.upload_config().chunk_size, 255);
	}

	#[test]
	fn image_argument_is_required() {
		assert!(Cli::try_parse_from(["sketch-upload"]).is_err());
	}
}
