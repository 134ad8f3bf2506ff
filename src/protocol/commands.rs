use crate::consts::{CMD_SEND_IMAGE, COMMAND_FRAME_SIZE};
use crate::error::UploadError;

/// Builds the "begin image transfer" frame announcing `chunk_size`-byte writes.
pub fn build_send_image(chunk_size: usize) -> Result<[u8; COMMAND_FRAME_SIZE], UploadError> {
	let size = u8::try_from(chunk_size)
		.ok()
		.filter(|s| *s > 0)
		.ok_or(UploadError::InvalidChunkSize(chunk_size))?;
	Ok([CMD_SEND_IMAGE, 0x00, 0x00, 0x00, size, 0x00, 0x02, 0x00])
}
