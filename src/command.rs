//! Console command dispatcher
//!
//! Every console line is one command: a single command byte, optionally
//! followed by a hex payload. The dispatcher runs the command against the
//! script store and the playback flags and returns the text to print.

use heapless::String;

use crate::channels::PlaybackControl;
use crate::codec::{self, HexError};
use crate::config::{JIGGLER_WIDTH, MAX_PAYLOAD_SIZE, READ_PREVIEW_SIZE, SCRIPT_CAPACITY, VERSION_STRING};
use crate::ducky;
use crate::jiggler;
use crate::report::{CapacityError, ScriptBuilder};
use crate::store::{ScriptStore, StoreError};

/// Longest generated response: the hex dump of the read preview
pub const RESPONSE_TEXT_LEN: usize = 2 * READ_PREVIEW_SIZE;

const HELP_TEXT: &str = concat!(
    "commands:\r\n",
    "  v        show firmware version\r\n",
    "  ?        show this help\r\n",
    "  w<hex>   write raw 16-byte records\r\n",
    "  d<hex>   write a compiled DuckyScript\r\n",
    "  j        write the mouse jiggler\r\n",
    "  r        dump the first record as hex\r\n",
    "  @        show the playback cursor (hex, little endian)\r\n",
    "  p        pause or resume playback\r\n",
    "  s        play a single report\r\n",
    "  z        rewind to the first record"
);

/// A parsed console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Version,
    Help,
    /// Hex digits of raw records
    WriteRaw(&'a [u8]),
    /// Hex digits of a compiled DuckyScript
    WriteDucky(&'a [u8]),
    Jiggle,
    Read,
    Cursor,
    TogglePause,
    Step,
    Reset,
}

impl<'a> Command<'a> {
    /// Parse a line with its terminator already stripped
    pub fn parse(line: &'a [u8]) -> Result<Self, CommandError> {
        let (&op, arg) = line.split_first().ok_or(CommandError::InvalidCommand)?;
        let command = match op {
            b'v' => Command::Version,
            b'?' => Command::Help,
            b'w' => Command::WriteRaw(arg),
            b'd' => Command::WriteDucky(arg),
            b'j' => Command::Jiggle,
            b'r' => Command::Read,
            b'@' => Command::Cursor,
            b'p' => Command::TogglePause,
            b's' => Command::Step,
            b'z' => Command::Reset,
            _ => return Err(CommandError::InvalidCommand),
        };
        Ok(command)
    }
}

/// Why a line produced an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    InvalidCommand,
    InvalidHex,
    ScriptTooLarge,
    Store(StoreError),
    LineTooLong,
}

impl CommandError {
    /// Text sent back to the operator
    pub const fn message(&self) -> &'static str {
        match self {
            CommandError::InvalidCommand => "invalid command, try ? for help",
            CommandError::InvalidHex => "invalid hex payload",
            CommandError::ScriptTooLarge => "script too large",
            CommandError::Store(StoreError::VerifyFailed) => "wrong data written",
            CommandError::Store(_) => "error writing flash",
            CommandError::LineTooLong => "line too long",
        }
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        CommandError::Store(e)
    }
}

impl From<HexError> for CommandError {
    fn from(e: HexError) -> Self {
        match e {
            HexError::InvalidDigit => CommandError::InvalidHex,
            HexError::BufferTooSmall => CommandError::ScriptTooLarge,
        }
    }
}

impl From<CapacityError> for CommandError {
    fn from(_: CapacityError) -> Self {
        CommandError::ScriptTooLarge
    }
}

/// Console response text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Static(&'static str),
    Text(String<RESPONSE_TEXT_LEN>),
}

impl Response {
    pub fn as_str(&self) -> &str {
        match self {
            Response::Static(s) => s,
            Response::Text(s) => s.as_str(),
        }
    }
}

/// Staging buffers for decoded payloads and generated scripts
pub struct Workspace {
    payload: [u8; MAX_PAYLOAD_SIZE],
    script: ScriptBuilder<SCRIPT_CAPACITY>,
}

impl Workspace {
    pub const fn new() -> Self {
        Self {
            payload: [0; MAX_PAYLOAD_SIZE],
            script: ScriptBuilder::new(),
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes console lines
pub struct Dispatcher<'a> {
    control: &'a PlaybackControl,
    work: &'a mut Workspace,
}

impl<'a> Dispatcher<'a> {
    pub fn new(control: &'a PlaybackControl, work: &'a mut Workspace) -> Self {
        Self { control, work }
    }

    /// Run one line and return the response, mapping failures to their messages
    pub fn dispatch<S: ScriptStore>(&mut self, line: &[u8], store: &mut S) -> Response {
        match self.execute(line, store) {
            Ok(response) => response,
            Err(e) => {
                warn!("command: {:?}", e);
                Response::Static(e.message())
            }
        }
    }

    pub fn execute<S: ScriptStore>(&mut self, line: &[u8], store: &mut S) -> Result<Response, CommandError> {
        let line = trim_terminator(line);
        let command = Command::parse(line)?;
        info!("command: {:?}", line[0] as char);

        match command {
            Command::Version => Ok(Response::Static(VERSION_STRING)),
            Command::Help => Ok(Response::Static(HELP_TEXT)),
            Command::WriteRaw(digits) => {
                let len = codec::decode_into(digits, &mut self.work.payload)?;
                store.program(0, &self.work.payload[..len])?;
                info!("command: wrote {} raw bytes", len);
                Ok(Response::Static("wrote flash"))
            }
            Command::WriteDucky(digits) => {
                let len = codec::decode_into(digits, &mut self.work.payload)?;
                let records = ducky::decode(&self.work.payload[..len], &mut self.work.script)?;
                store.program(0, self.work.script.as_bytes())?;
                info!("command: wrote {} ducky records", records);
                Ok(Response::Static("wrote flash"))
            }
            Command::Jiggle => {
                let records = jiggler::generate(JIGGLER_WIDTH, &mut self.work.script)?;
                store.program(0, self.work.script.as_bytes())?;
                info!("command: wrote {} jiggler records", records);
                Ok(Response::Static("wrote flash"))
            }
            Command::Read => {
                let mut preview = [0u8; READ_PREVIEW_SIZE];
                store.read(0, &mut preview);
                Ok(Response::Text(codec::encode(&preview)?))
            }
            Command::Cursor => Ok(Response::Text(codec::encode(&self.control.cursor().to_le_bytes())?)),
            Command::TogglePause => {
                let paused = self.control.toggle_pause();
                Ok(Response::Static(if paused { "paused" } else { "resumed" }))
            }
            Command::Step => {
                self.control.request_step();
                Ok(Response::Static("step"))
            }
            Command::Reset => {
                self.control.request_reset();
                Ok(Response::Static(""))
            }
        }
    }
}

fn trim_terminator(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}
