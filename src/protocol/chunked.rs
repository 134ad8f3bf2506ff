use crate::error::UploadError;

/// Splits a frame into transfer-ordered chunks.
///
/// The device fills its frame buffer back to front, so by default the whole
/// byte sequence is reversed before slicing. The last chunk may be short.
/// There is no index or checksum in a chunk; the device relies on in-order
/// delivery from the link.
pub fn encode_chunked(
	data: &[u8],
	chunk_size: usize,
	reverse: bool,
) -> Result<Vec<Vec<u8>>, UploadError> {
	if chunk_size == 0 {
		return Err(UploadError::InvalidChunkSize(chunk_size));
	}

	let mut payload = data.to_vec();
	if reverse {
		payload.reverse();
	}
	Ok(payload.chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(len: usize) -> Vec<u8> {
		(0..len).map(|i| (i * 7 % 251) as u8).collect()
	}

	#[test]
	fn full_frame_splits_into_480_chunks() {
		let chunks = encode_chunked(&sample(38400), 80, true).unwrap();
		assert_eq!(chunks.len(), 480);
		assert!(chunks.iter().all(|c| c.len() == 80));
	}

	#[test]
	fn first_chunk_starts_with_last_byte() {
		let data = sample(10);
		let chunks = encode_chunked(&data, 4, true).unwrap();
		assert_eq!(chunks[0], vec![data[9], data[8], data[7], data[6]]);
		assert_eq!(chunks[2], vec![data[1], data[0]]);
	}

	#[test]
	fn reversal_is_lossless_for_any_size() {
		for len in [0, 1, 79, 80, 81, 1000, 38400] {
			let data = sample(len);
			for chunk_size in [1, 3, 80, 128, 255, 4096] {
				let chunks = encode_chunked(&data, chunk_size, true).unwrap();
				assert_eq!(chunks.len(), len.div_ceil(chunk_size));
				if let Some(last) = chunks.last() {
					let tail = len % chunk_size;
					assert_eq!(last.len(), if tail == 0 { chunk_size } else { tail });
				}

				let mut joined = chunks.concat();
				joined.reverse();
				assert_eq!(joined, data, "len {len} chunk {chunk_size}");
			}
		}
	}

	#[test]
	fn reversal_can_be_disabled() {
		let data = sample(200);
		let chunks = encode_chunked(&data, 80, false).unwrap();
		assert_eq!(chunks.concat(), data);
		assert_eq!(chunks[2].len(), 40);
	}

	#[test]
	fn zero_chunk_size_is_rejected() {
		assert!(matches!(
			encode_chunked(&sample(8), 0, true),
			Err(UploadError::InvalidChunkSize(0))
		));
	}
}
