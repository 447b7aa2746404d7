#![allow(dead_code)]

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use picoduck::channels::PlaybackControl;
use picoduck::command::{Dispatcher, Workspace};
use picoduck::config::{LINE_BUFFER_SIZE, SCRIPT_REGION_SIZE};
use picoduck::engine::{Player, ReportSink, TickOutcome};
use picoduck::serial::{Console, Reply};
use picoduck::store::FlashStore;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Flash size of the simulated part: the script region plus the firmware area before it
pub const RAM_FLASH_SIZE: usize = 4 * SCRIPT_REGION_SIZE as usize;
pub const SCRIPT_BASE: u32 = RAM_FLASH_SIZE as u32 - SCRIPT_REGION_SIZE;

#[derive(Debug)]
pub struct RamFlashError;

impl NorFlashError for RamFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

/// RAM-backed NOR flash with RP2040 geometry
pub struct RamFlash {
    pub data: Vec<u8>,
}

impl RamFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; RAM_FLASH_SIZE],
        }
    }
}

impl ErrorType for RamFlash {
    type Error = RamFlashError;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let src = self.data.get(start..start + bytes.len()).ok_or(RamFlashError)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.data.get_mut(from as usize..to as usize).ok_or(RamFlashError)?.fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let dst = self.data.get_mut(start..start + bytes.len()).ok_or(RamFlashError)?;
        for (d, s) in dst.iter_mut().zip(bytes) {
            *d &= *s;
        }
        Ok(())
    }
}

/// Collects every packet the engine sends
#[derive(Default)]
pub struct VecSink {
    pub packets: Vec<Vec<u8>>,
    /// Number of upcoming attempts to refuse
    pub busy: usize,
}

impl ReportSink for VecSink {
    type Error = ();

    fn try_send(&mut self, packet: &[u8]) -> nb::Result<(), ()> {
        if self.busy > 0 {
            self.busy -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.packets.push(packet.to_vec());
        Ok(())
    }
}

/// Console, dispatcher, store and engine wired together like the firmware
pub struct Device {
    pub control: PlaybackControl,
    pub store: FlashStore<RamFlash>,
    pub player: Player,
    pub sink: VecSink,
    work: Box<Workspace>,
    console: Box<Console<LINE_BUFFER_SIZE>>,
}

impl Device {
    pub fn new() -> Self {
        Self {
            control: PlaybackControl::new(),
            store: FlashStore::new(RamFlash::new(), SCRIPT_BASE, SCRIPT_REGION_SIZE),
            player: Player::new(),
            sink: VecSink::default(),
            work: Box::new(Workspace::new()),
            console: Box::new(Console::new()),
        }
    }

    /// Type `input` into the console and return everything sent back
    pub fn type_str(&mut self, input: &str) -> String {
        let mut dispatcher = Dispatcher::new(&self.control, &mut self.work);
        let mut out = Vec::new();
        let mut reply = Reply::new();
        for chunk in input.as_bytes().chunks(64) {
            for &byte in chunk {
                if self.console.feed(byte, &mut dispatcher, &mut self.store, &mut reply) {
                    out.extend_from_slice(&reply);
                    reply.clear();
                }
            }
            out.extend_from_slice(&reply);
            reply.clear();
        }
        String::from_utf8(out).expect("console output is ascii")
    }

    /// Run a command line and return only its response text
    pub fn command(&mut self, line: &str) -> String {
        let echo = line.len() + 2;
        let out = self.type_str(&format!("{}\r", line));
        out[echo..out.len() - "\r\nduck> ".len()].to_string()
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.player.tick(&self.control, &mut self.store, &mut self.sink)
    }

    pub fn run_ticks(&mut self, ticks: usize) -> Vec<TickOutcome> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    pub fn boot(&mut self) -> bool {
        self.player.boot(&mut self.store, &self.control)
    }

    /// Raw bytes of the simulated flash
    pub fn flash(&self) -> &[u8] {
        &self.store.flash().data
    }
}
