use std::time::Duration;

use uuid::Uuid;

/// Write + notify characteristic used for both commands and pixel data.
pub const CHAR_UUID: Uuid = Uuid::from_u128(0x0000ffe3_0000_1000_8000_00805f9b34fb);

pub const DISPLAY_WIDTH: u32 = 160;
pub const DISPLAY_HEIGHT: u32 = 120;
pub const FRAME_PIXEL_SIZE: usize = (DISPLAY_WIDTH * DISPLAY_HEIGHT * 2) as usize;

pub const CMD_SEND_IMAGE: u8 = 0x01;
pub const COMMAND_FRAME_SIZE: usize = 8;

pub const NAME_TOKENS: [&str; 2] = ["smart", "sketch"];
pub const READY_TOKEN: &str = "ok";
pub const DONE_TOKEN: &str = "done";

pub const DEFAULT_CHUNK_SIZE: usize = 80;
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(5);
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DONE_TIMEOUT: Duration = Duration::from_secs(20);
pub const CHUNK_DELAY: Duration = Duration::from_millis(10);
