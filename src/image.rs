use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use tracing::{debug, info};

use crate::consts::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_PIXEL_SIZE};
use crate::error::UploadError;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Rejects missing files and unsupported extensions before anything is decoded.
pub fn validate_input(path: &Path) -> Result<(), UploadError> {
	if !path.is_file() {
		return Err(UploadError::FileNotFound(path.to_path_buf()));
	}

	let ext = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_lowercase();

	if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
		let shown = if ext.is_empty() {
			"<none>".to_string()
		} else {
			format!(".{ext}")
		};
		return Err(UploadError::UnsupportedFormat(shown));
	}
	Ok(())
}

/// Decodes `path` and returns the device frame in RGB565 little-endian.
///
/// The extension only gates what is accepted; the decoder is picked from the
/// file contents, so a PNG named `.jpg` still loads.
pub fn load_image(path: &Path) -> Result<Vec<u8>, UploadError> {
	validate_input(path)?;
	let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
	info!(
		width = img.width(),
		height = img.height(),
		"loaded {}",
		path.display()
	);
	let frame = transcode(&img, DISPLAY_WIDTH, DISPLAY_HEIGHT);
	debug_assert_eq!(frame.len(), FRAME_PIXEL_SIZE);
	Ok(frame)
}

pub fn transcode(img: &DynamicImage, width: u32, height: u32) -> Vec<u8> {
	let rgb = prepare_image(img, width, height);
	rgb_to_rgb565(rgb.as_raw(), width, height)
}

fn prepare_image(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
	let rgb = match img {
		DynamicImage::ImageRgb8(rgb) => rgb.clone(),
		other => {
			debug!(color = ?other.color(), "converting to RGB");
			other.to_rgb8()
		}
	};

	if rgb.dimensions() == (width, height) {
		return rgb;
	}
	debug!(
		from = ?rgb.dimensions(),
		to = ?(width, height),
		"resizing"
	);
	image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
}

pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
	let r5 = (r >> 3) as u16;
	let g6 = (g >> 2) as u16;
	let b5 = (b >> 3) as u16;
	(r5 << 11) | (g6 << 5) | b5
}

/// Expands a 5-6-5 pixel back to 8 bits per channel by bit replication.
pub fn unpack_rgb565(pixel: u16) -> [u8; 3] {
	let r = ((pixel >> 11) & 0x1F) as u8;
	let g = ((pixel >> 5) & 0x3F) as u8;
	let b = (pixel & 0x1F) as u8;
	[(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

pub fn rgb_to_rgb565(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
	let pixel_count = (width * height) as usize;
	let mut buf = Vec::with_capacity(pixel_count * 2);
	for px in rgb.chunks_exact(3).take(pixel_count) {
		let pixel = pack_rgb565(px[0], px[1], px[2]);
		buf.extend_from_slice(&pixel.to_le_bytes());
	}
	buf
}

/// Renders a device frame back into an image, as the projector would show it.
pub fn rgb565_to_image(data: &[u8], width: u32, height: u32) -> RgbImage {
	let mut img = RgbImage::new(width, height);
	for (i, px) in data.chunks_exact(2).enumerate() {
		let (x, y) = (i as u32 % width, i as u32 / width);
		if y >= height {
			break;
		}
		let pixel = u16::from_le_bytes([px[0], px[1]]);
		img.put_pixel(x, y, image::Rgb(unpack_rgb565(pixel)));
	}
	img
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage};

	fn device_frame(img: &DynamicImage) -> Vec<u8> {
		transcode(img, DISPLAY_WIDTH, DISPLAY_HEIGHT)
	}

	#[test]
	fn any_input_yields_full_frame() {
		let inputs = [
			DynamicImage::ImageRgb8(RgbImage::new(320, 240)),
			DynamicImage::ImageRgb8(RgbImage::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)),
			DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 80, Rgba([10, 20, 30, 128]))),
			DynamicImage::ImageLuma8(GrayImage::from_pixel(7, 3, Luma([200]))),
		];
		for img in &inputs {
			assert_eq!(device_frame(img).len(), FRAME_PIXEL_SIZE);
		}
		assert_eq!(FRAME_PIXEL_SIZE, 38400);
	}

	#[test]
	fn pixels_are_little_endian_565() {
		let mut img = RgbImage::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
		img.put_pixel(0, 0, Rgb([255, 0, 0]));
		img.put_pixel(1, 0, Rgb([0, 255, 0]));
		img.put_pixel(2, 0, Rgb([0, 0, 255]));
		img.put_pixel(0, 1, Rgb([255, 255, 255]));

		let data = device_frame(&DynamicImage::ImageRgb8(img));
		assert_eq!(&data[0..2], &[0x00, 0xF8]);
		assert_eq!(&data[2..4], &[0xE0, 0x07]);
		assert_eq!(&data[4..6], &[0x1F, 0x00]);
		assert_eq!(&data[6..8], &[0x00, 0x00]);

		let row = (DISPLAY_WIDTH * 2) as usize;
		assert_eq!(&data[row..row + 2], &[0xFF, 0xFF]);
	}

	#[test]
	fn grayscale_expands_to_equal_channels() {
		let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(
			DISPLAY_WIDTH,
			DISPLAY_HEIGHT,
			Luma([255]),
		));
		let data = device_frame(&img);
		assert!(data.iter().all(|&b| b == 0xFF));
	}

	#[test]
	fn quantization_error_is_bounded() {
		for v in 0..=255u8 {
			let [r, _, _] = unpack_rgb565(pack_rgb565(v, 0, 0));
			let [_, g, _] = unpack_rgb565(pack_rgb565(0, v, 0));
			let [_, _, b] = unpack_rgb565(pack_rgb565(0, 0, v));
			assert!(v.abs_diff(r) <= 7, "red {v} -> {r}");
			assert!(v.abs_diff(g) <= 3, "green {v} -> {g}");
			assert!(v.abs_diff(b) <= 7, "blue {v} -> {b}");
		}
	}

	#[test]
	fn preview_matches_source_within_quantization() {
		let src = RgbImage::from_fn(DISPLAY_WIDTH, DISPLAY_HEIGHT, |x, y| {
			Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
		});
		let data = rgb_to_rgb565(src.as_raw(), DISPLAY_WIDTH, DISPLAY_HEIGHT);
		let preview = rgb565_to_image(&data, DISPLAY_WIDTH, DISPLAY_HEIGHT);

		for (a, b) in src.pixels().zip(preview.pixels()) {
			assert!(a[0].abs_diff(b[0]) <= 7);
			assert!(a[1].abs_diff(b[1]) <= 3);
			assert!(a[2].abs_diff(b[2]) <= 7);
		}
	}

	#[test]
	fn validate_rejects_missing_and_unsupported() {
		let dir = tempfile::tempdir().unwrap();

		let missing = dir.path().join("nope.png");
		assert!(matches!(
			validate_input(&missing),
			Err(UploadError::FileNotFound(_))
		));

		let gif = dir.path().join("anim.gif");
		std::fs::write(&gif, b"GIF89a").unwrap();
		match validate_input(&gif) {
			Err(UploadError::UnsupportedFormat(ext)) => assert_eq!(ext, ".gif"),
			other => panic!("unexpected: {other:?}"),
		}

		let upper = dir.path().join("PHOTO.JPEG");
		std::fs::write(&upper, b"").unwrap();
		assert!(validate_input(&upper).is_ok());
	}

	#[test]
	fn loads_png_and_jpeg_from_disk() {
		let dir = tempfile::tempdir().unwrap();
		let src = RgbImage::from_pixel(320, 240, Rgb([40, 120, 200]));

		for name in ["input.png", "input.jpg"] {
			let path = dir.path().join(name);
			src.save(&path).unwrap();
			let data = load_image(&path).unwrap();
			assert_eq!(data.len(), FRAME_PIXEL_SIZE);
		}
	}

	#[test]
	fn format_is_detected_from_contents() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("actually_png.jpg");
		RgbImage::from_pixel(DISPLAY_WIDTH, DISPLAY_HEIGHT, Rgb([255, 0, 0]))
			.save_with_format(&path, ImageFormat::Png)
			.unwrap();

		let data = load_image(&path).unwrap();
		assert_eq!(data.len(), FRAME_PIXEL_SIZE);
		assert_eq!(&data[0..2], &[0x00, 0xF8]);
	}

	#[test]
	fn corrupt_file_fails_at_decode() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("broken.png");
		std::fs::write(&path, b"definitely not a png").unwrap();
		assert!(matches!(load_image(&path), Err(UploadError::Decode(_))));
	}
}
