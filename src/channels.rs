//! Inter-task communication
//!
//! The console task and the playback task share a handful of flags. The
//! console only raises requests; the engine owns the cursor and the delay
//! countdown and applies requests on its next tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{HID_QUEUE_DEPTH, MAX_PACKET_LEN};

/// One HID input report ready for the endpoint
pub type HidPacket = Vec<u8, MAX_PACKET_LEN>;

/// Channel for HID packets from the playback engine to the USB writer
/// Buffer size: small, so a stalled host pushes back on the engine quickly
pub static HID_REPORT_CHANNEL: Channel<CriticalSectionRawMutex, HidPacket, HID_QUEUE_DEPTH> = Channel::new();

/// Raised for every sent report and received console byte; blinks the activity LED
pub static ACTIVITY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Playback flags shared between the console and the engine
pub static PLAYBACK: PlaybackControl = PlaybackControl::new();

/// Operator-controlled execution mode plus the published cursor
pub struct PlaybackControl {
    paused: AtomicBool,
    single_step: AtomicBool,
    reset_requested: AtomicBool,
    cursor: AtomicU32,
}

impl PlaybackControl {
    /// Starts paused with the cursor at zero
    pub const fn new() -> Self {
        Self {
            paused: AtomicBool::new(true),
            single_step: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
            cursor: AtomicU32::new(0),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip the pause flag, returning the new state
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn request_step(&self) {
        self.single_step.store(true, Ordering::Release);
    }

    pub fn single_step(&self) -> bool {
        self.single_step.load(Ordering::Acquire)
    }

    /// Called by the engine after the stepped report went out
    pub(crate) fn finish_step(&self) {
        self.single_step.store(false, Ordering::Release);
        self.paused.store(true, Ordering::Release);
    }

    /// Ask the engine to rewind. The published cursor reads zero immediately.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
        self.cursor.store(0, Ordering::Release);
    }

    pub(crate) fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }

    /// Last cursor value published by the engine
    pub fn cursor(&self) -> u32 {
        self.cursor.load(Ordering::Acquire)
    }

    pub(crate) fn publish_cursor(&self, cursor: u32) {
        self.cursor.store(cursor, Ordering::Release);
    }
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new()
    }
}
