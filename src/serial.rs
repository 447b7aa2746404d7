//! Line-oriented serial console
//!
//! Characters are echoed as they arrive and collected until a CR or LF. The
//! finished line is dispatched and the reply is the echo, the response, a
//! CRLF and a fresh prompt. Everything is staged in one reply buffer so the
//! USB side can flush it in max-packet chunks.

use heapless::Vec;

use crate::command::{CommandError, Dispatcher};
use crate::config::{PROMPT, REPLY_BUFFER_SIZE};
use crate::store::ScriptStore;

/// Bytes queued for the host
pub type Reply = Vec<u8, REPLY_BUFFER_SIZE>;

/// Accumulates one command line. Bytes past capacity are dropped and the line is flagged.
pub struct LineBuffer<const N: usize> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    pub fn push(&mut self, byte: u8) {
        if self.buf.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Console<const N: usize> {
    line: LineBuffer<N>,
}

impl<const N: usize> Console<N> {
    pub const fn new() -> Self {
        Self { line: LineBuffer::new() }
    }

    /// Queue the prompt, e.g. when a terminal connects
    pub fn greet(&self, reply: &mut Reply) {
        put(reply, PROMPT.as_bytes());
    }

    /// Handle one received byte. Returns true if it completed a line.
    pub fn feed<S: ScriptStore>(
        &mut self,
        byte: u8,
        dispatcher: &mut Dispatcher<'_>,
        store: &mut S,
        reply: &mut Reply,
    ) -> bool {
        if byte == b'\r' {
            put(reply, b"\r\n");
        } else {
            put(reply, &[byte]);
        }

        if byte != b'\r' && byte != b'\n' {
            self.line.push(byte);
            return false;
        }

        if self.line.overflowed() {
            warn!("console: dropped overlong line");
            put(reply, CommandError::LineTooLong.message().as_bytes());
        } else {
            let response = dispatcher.dispatch(self.line.as_slice(), store);
            put(reply, response.as_str().as_bytes());
        }
        put(reply, b"\r\n");
        put(reply, PROMPT.as_bytes());

        self.line.clear();
        true
    }
}

impl<const N: usize> Default for Console<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn put(reply: &mut Reply, bytes: &[u8]) {
    if reply.extend_from_slice(bytes).is_err() {
        warn!("console: reply buffer full, output truncated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::PlaybackControl;
    use crate::command::Workspace;
    use crate::store::mock::MockFlash;
    use crate::store::FlashStore;

    fn session(input: &[u8]) -> std::string::String {
        let control = PlaybackControl::new();
        let mut work = Workspace::new();
        let mut dispatcher = Dispatcher::new(&control, &mut work);
        let mut store = FlashStore::new(MockFlash::<4096>::new(), 0, 4096);
        let mut console = Console::<8>::new();
        let mut reply = Reply::new();
        for &b in input {
            console.feed(b, &mut dispatcher, &mut store, &mut reply);
        }
        std::string::String::from_utf8(reply.to_vec()).unwrap()
    }

    #[test]
    fn carriage_return_expands_to_crlf() {
        assert_eq!(session(b"p\r"), "p\r\nresumed\r\nduck> ");
    }

    #[test]
    fn line_feed_also_terminates() {
        assert_eq!(session(b"s\n"), "s\nstep\r\nduck> ");
    }

    #[test]
    fn partial_line_is_only_echoed() {
        assert_eq!(session(b"w01"), "w01");
    }

    #[test]
    fn overlong_line_is_rejected() {
        let out = session(b"w0102030405\r");
        assert_eq!(out, "w0102030405\r\nline too long\r\nduck> ");
    }

    #[test]
    fn buffer_recovers_after_overflow() {
        let out = session(b"pppppppppppp\rp\r");
        assert!(out.ends_with("p\r\nresumed\r\nduck> "));
    }

    #[test]
    fn line_buffer_flags_overflow() {
        let mut line = LineBuffer::<2>::new();
        line.push(b'a');
        line.push(b'b');
        assert!(!line.overflowed());
        line.push(b'c');
        assert!(line.overflowed());
        assert_eq!(line.as_slice(), b"ab");
        line.clear();
        assert!(!line.overflowed());
    }
}
