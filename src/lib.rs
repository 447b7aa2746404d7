//! PicoDuck - Scriptable USB Keyboard/Mouse Injector for RP2040
//!
//! This library stores a script of HID reports in flash and replays it with
//! millisecond timing, while a serial console loads and controls the script.
//!
//! ## Script Sources
//! - Raw 16-byte report records written verbatim
//! - Compiled DuckyScript binaries
//! - A built-in mouse jiggler pattern
//!
//! ## Architecture
//! - **Core**: record format, flash store, decoders, dispatcher and playback
//!   engine are hardware independent and tested on the host
//! - **Async**: Embassy tasks drive the engine tick and the USB console
//! - **Shared state**: atomic playback flags and a bounded HID packet channel
//! - **Firmware shell**: enabled with the `rp2040` feature

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod channels;
pub mod codec;
pub mod command;
pub mod config;
pub mod ducky;
pub mod engine;
pub mod jiggler;
pub mod report;
pub mod serial;
pub mod store;

#[cfg(feature = "rp2040")]
pub mod hardware;
#[cfg(feature = "rp2040")]
pub mod supervisor;
#[cfg(feature = "rp2040")]
pub mod usb;

#[cfg(feature = "rp2040")]
use embassy_rp::usb::InterruptHandler;
#[cfg(feature = "rp2040")]
use embassy_rp::{bind_interrupts, peripherals};

// USB interrupt binding
#[cfg(feature = "rp2040")]
bind_interrupts!(pub struct Irqs {
    USBCTRL_IRQ => InterruptHandler<peripherals::USB>;
});
