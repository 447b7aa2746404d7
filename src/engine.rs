//! Playback engine
//!
//! A tick-driven state machine that walks the stored script one record per
//! tick. Keyboard and mouse records are sent to the HID transport, delay
//! records hold the cursor for a number of ticks, and an end marker (or any
//! unknown tag) rewinds to the start so the script loops.
//!
//! The tick never blocks: the transport is polled a bounded number of times
//! and a report that can't be queued is retried on the following tick.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;

use crate::channels::{HidPacket, PlaybackControl};
use crate::config::{RECORD_SIZE, SEND_RETRY_LIMIT};
use crate::report::{hid_packet, RawRecord, ReportKind};
use crate::store::ScriptStore;

/// Destination for HID packets
pub trait ReportSink {
    type Error;

    /// Queue one packet. `WouldBlock` means the transport is busy right now.
    fn try_send(&mut self, packet: &[u8]) -> nb::Result<(), Self::Error>;
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Paused and no step pending
    Paused,
    /// Sitting on a NOP record, which never advances
    Stalled,
    /// Countdown loaded from a delay record
    DelayArmed { ticks: u8 },
    /// Countdown still running
    Delaying { remaining: u8 },
    /// Countdown finished, cursor advanced
    DelayElapsed,
    /// Report handed to the transport, cursor advanced
    Sent { kind: ReportKind },
    /// Transport stayed busy for the whole retry budget
    Busy,
    /// Cursor went back to zero
    Rewound,
}

/// Cursor and delay state of the running script
#[derive(Debug, Default)]
pub struct Player {
    cursor: u32,
    /// Remaining ticks while parked on a delay record
    delay: Option<u8>,
}

impl Player {
    pub const fn new() -> Self {
        Self {
            cursor: 0,
            delay: None,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_delaying(&self) -> bool {
        self.delay.is_some()
    }

    /// Start playing a previously stored script. Returns whether playback auto-started.
    pub fn boot<S: ScriptStore>(&mut self, store: &mut S, control: &PlaybackControl) -> bool {
        let first = Self::fetch(store, 0);
        if first[0] != ReportKind::End as u8 {
            info!("engine: stored script found, starting playback");
            control.set_paused(false);
            true
        } else {
            info!("engine: no stored script, paused");
            false
        }
    }

    /// Evaluate the record at the cursor
    pub fn tick<S, K>(&mut self, control: &PlaybackControl, store: &mut S, sink: &mut K) -> TickOutcome
    where
        S: ScriptStore,
        K: ReportSink,
    {
        if control.take_reset() {
            debug!("engine: cursor reset from {}", self.cursor);
            self.cursor = 0;
            self.delay = None;
        }

        let stepping = control.single_step();
        if control.is_paused() && !stepping {
            return TickOutcome::Paused;
        }

        let records = store.capacity() / RECORD_SIZE as u32;
        if self.cursor >= records {
            return self.rewind(control);
        }

        let raw = Self::fetch(store, self.cursor);
        let kind = ReportKind::from_tag(raw[0]);

        if let Some(packet) = hid_packet(&raw) {
            return self.transmit(kind, packet, stepping, control, sink);
        }

        match kind {
            ReportKind::Nop => TickOutcome::Stalled,
            ReportKind::Delay => self.delay_tick(raw[1], control),
            _ => self.rewind(control),
        }
    }

    fn fetch<S: ScriptStore>(store: &mut S, index: u32) -> RawRecord {
        let mut raw = [0u8; RECORD_SIZE];
        store.read(index * RECORD_SIZE as u32, &mut raw);
        raw
    }

    fn delay_tick(&mut self, ticks: u8, control: &PlaybackControl) -> TickOutcome {
        match self.delay {
            None => {
                trace!("engine: delay of {} ticks at {}", ticks, self.cursor);
                self.delay = Some(ticks);
                TickOutcome::DelayArmed { ticks }
            }
            Some(remaining) => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.delay = None;
                    self.advance(control);
                    TickOutcome::DelayElapsed
                } else {
                    self.delay = Some(remaining);
                    TickOutcome::Delaying { remaining }
                }
            }
        }
    }

    fn transmit<K: ReportSink>(
        &mut self,
        kind: ReportKind,
        packet: &[u8],
        stepping: bool,
        control: &PlaybackControl,
        sink: &mut K,
    ) -> TickOutcome {
        for _ in 0..SEND_RETRY_LIMIT {
            match sink.try_send(packet) {
                Ok(()) => {
                    trace!("engine: sent {:?} at {}", kind, self.cursor);
                    if stepping {
                        control.finish_step();
                        debug!("engine: step done at {}", self.cursor);
                    }
                    self.advance(control);
                    return TickOutcome::Sent { kind };
                }
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(_)) => {
                    warn!("engine: transport rejected report at {}", self.cursor);
                    break;
                }
            }
        }
        TickOutcome::Busy
    }

    fn advance(&mut self, control: &PlaybackControl) {
        self.cursor += 1;
        control.publish_cursor(self.cursor);
    }

    fn rewind(&mut self, control: &PlaybackControl) -> TickOutcome {
        self.cursor = 0;
        self.delay = None;
        control.publish_cursor(0);
        TickOutcome::Rewound
    }
}

/// Transport error of the channel-backed sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Packet longer than any HID report this device sends
    Oversized,
}

/// Report sink feeding the USB writer through a bounded channel
pub struct ChannelSink<'a, M: RawMutex, const N: usize> {
    sender: Sender<'a, M, HidPacket, N>,
}

impl<'a, M: RawMutex, const N: usize> ChannelSink<'a, M, N> {
    pub fn new(sender: Sender<'a, M, HidPacket, N>) -> Self {
        Self { sender }
    }
}

impl<M: RawMutex, const N: usize> ReportSink for ChannelSink<'_, M, N> {
    type Error = SinkError;

    fn try_send(&mut self, packet: &[u8]) -> nb::Result<(), Self::Error> {
        let packet = HidPacket::from_slice(packet).map_err(|_| nb::Error::Other(SinkError::Oversized))?;
        self.sender.try_send(packet).map_err(|_| nb::Error::WouldBlock)
    }
}

#[cfg(feature = "rp2040")]
mod task {
    use embassy_time::{Duration, Ticker};

    use super::{ChannelSink, Player, TickOutcome};
    use crate::channels::{ACTIVITY, HID_REPORT_CHANNEL, PLAYBACK};
    use crate::config::TICK_PERIOD_MS;
    use crate::hardware::SharedScriptStore;

    /// Runs the engine once per tick against the shared store
    #[embassy_executor::task]
    pub async fn playback_task(store: &'static SharedScriptStore) {
        info!("Playback task started");

        let mut player = Player::new();
        let mut sink = ChannelSink::new(HID_REPORT_CHANNEL.sender());
        if store.lock(|s| player.boot(&mut *s.borrow_mut(), &PLAYBACK)) {
            info!("Playback: running stored script");
        } else {
            info!("Playback: paused, waiting for console commands...");
        }

        let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
        loop {
            ticker.next().await;
            let outcome = store.lock(|s| player.tick(&PLAYBACK, &mut *s.borrow_mut(), &mut sink));
            match outcome {
                TickOutcome::Sent { .. } => ACTIVITY.signal(()),
                TickOutcome::Busy => debug!("Playback: transport busy at {}", player.cursor()),
                _ => {}
            }
        }
    }
}

#[cfg(feature = "rp2040")]
pub use task::playback_task;
