//! DuckyScript binary decoder
//!
//! A compiled DuckyScript payload is a stream of little-endian 16-bit words.
//! A word with a zero low byte is a delay of `high` ticks; any other word is a
//! key press with `low` as the key code and `high` as the modifier mask.
//! Every press is followed by a release so repeated keys register.

use crate::report::{CapacityError, KeyboardReport, Report, ScriptBuilder, DUCKY_MARKER};

/// Worst-case record count for `input_len` bytes of DuckyScript
pub const fn max_records(input_len: usize) -> usize {
    2 * (input_len / 2) + 1
}

/// Decode `input` into `out`, replacing its contents. Returns the record count.
pub fn decode<const N: usize>(input: &[u8], out: &mut ScriptBuilder<N>) -> Result<usize, CapacityError> {
    out.clear();

    // A trailing odd byte is not part of any word
    for word in input.chunks_exact(2) {
        let key = word[0];
        let high = word[1];

        if key == 0 {
            out.push(Report::Delay { ticks: high })?;
            continue;
        }

        let mut keys = [0u8; 6];
        keys[0] = key;
        out.push(Report::Keyboard(KeyboardReport {
            modifiers: high,
            reserved: DUCKY_MARKER,
            keys,
            leds: 0,
        }))?;
        out.push(Report::Keyboard(KeyboardReport::release()))?;
    }

    out.push(Report::End)?;
    debug!("ducky: {} bytes -> {} records", input.len(), out.len());
    Ok(out.len())
}
