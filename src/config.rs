//! Hardware and protocol configuration for PicoDuck
//! RP2040-based scriptable keyboard/mouse injector

// ===================================================================
// Firmware Identity
// ===================================================================

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_STRING: &str = concat!("Pico Duck version ", env!("CARGO_PKG_VERSION"));

// ===================================================================
// USB Configuration
// ===================================================================

pub const USB_VID: u16 = 0x05ac; // Presents as a generic aluminium keyboard
pub const USB_PID: u16 = 0x2227;
pub const USB_MANUFACTURER: &str = "PicoDuck";
pub const USB_PRODUCT: &str = "Pico Duck";
pub const USB_SERIAL: &str = "PICODUCK0001";
pub const USB_SERIAL_INTERFACE: &str = "Pico Duck Console";
pub const USB_BCD_DEVICE: u16 = 0x0200;
pub const USB_MAX_POWER_MA: u16 = 100;

pub const HID_POLL_RATE_MS: u8 = 1; // Host polls the report endpoint every 1ms
pub const HID_MAX_PACKET_SIZE: u16 = 16;
pub const CDC_PACKET_SIZE: u16 = 64;

// ===================================================================
// Report Record Layout
// ===================================================================

pub const RECORD_SIZE: usize = 16; // Every stored record is 16 bytes
pub const KEYBOARD_PACKET_LEN: usize = 9; // tag + modifiers + reserved + 6 keys
pub const MOUSE_PACKET_LEN: usize = 5; // tag + buttons + x + y + wheel
pub const MAX_PACKET_LEN: usize = KEYBOARD_PACKET_LEN;

// ===================================================================
// Flash Layout - Raspberry Pi Pico (W25Q16, 2MB)
// ===================================================================

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const FLASH_ERASE_SIZE: u32 = 4096; // RP2040 sector size
pub const SCRIPT_REGION_SIZE: u32 = 16 * 1024; // 4 sectors at the end of flash
pub const SCRIPT_FLASH_OFFSET: u32 = FLASH_SIZE as u32 - SCRIPT_REGION_SIZE;
pub const SCRIPT_CAPACITY: usize = SCRIPT_REGION_SIZE as usize / RECORD_SIZE; // 1024 records
pub const PROGRAM_UNIT: usize = 4; // Bytes programmed and verified per step

// ===================================================================
// Playback Configuration
// ===================================================================

pub const TICK_PERIOD_MS: u64 = 1; // One playback tick per millisecond
pub const SEND_RETRY_LIMIT: usize = 8; // Attempts per tick before deferring a report
pub const HID_QUEUE_DEPTH: usize = 4; // Packets buffered between engine and endpoint
pub const JIGGLER_WIDTH: usize = 30; // Pixels travelled in each direction

// ===================================================================
// Console Configuration
// ===================================================================

pub const PROMPT: &str = "duck> ";
pub const LINE_BUFFER_SIZE: usize = 2048; // Longest accepted command line
pub const MAX_PAYLOAD_SIZE: usize = (LINE_BUFFER_SIZE - 1) / 2; // Hex bytes after the command char
pub const REPLY_BUFFER_SIZE: usize = 1024;
pub const READ_PREVIEW_SIZE: usize = 16; // Bytes shown by the `r` command

// ===================================================================
// GPIO Pin Assignments - Raspberry Pi Pico
// ===================================================================

pub const LED_ACTIVITY_PIN: u8 = 25; // Built-in LED on Pico

// ===================================================================
// Supervisor
// ===================================================================

pub const STATUS_INTERVAL_SECS: u64 = 10;
pub const STATUS_REPORT_SECS: u32 = 60;
