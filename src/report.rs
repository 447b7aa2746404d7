//! Report records
//!
//! A script is a flat array of 16-byte records. The first byte is the record
//! kind, which doubles as the HID report ID for keyboard and mouse records, so
//! a stored record can be handed to the endpoint without re-encoding.
//!
//! ```text
//! KEYBOARD  [0x01, modifiers, reserved, key0..key5, leds, pad x6]
//! MOUSE     [0x02, buttons, x, y, wheel, pad x11]
//! DELAY     [0xFE, ticks, pad x14]
//! END       [0xFF, ...]
//! NOP       [0x00, ...]
//! ```

use heapless::Vec;

use crate::config::{KEYBOARD_PACKET_LEN, MOUSE_PACKET_LEN, RECORD_SIZE};

/// One stored record, exactly as laid out in flash
pub type RawRecord = [u8; RECORD_SIZE];

/// Reserved-byte value marking keyboard records produced by the DuckyScript decoder
pub const DUCKY_MARKER: u8 = 1;

/// Byte value of erased flash
pub const ERASED_BYTE: u8 = 0xFF;

/// Record kind tag stored in byte 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportKind {
    Nop = 0,
    Keyboard = 1,
    Mouse = 2,
    Delay = 254,
    End = 255,
}

impl ReportKind {
    /// Map a tag byte to a kind. Unknown tags behave as `End`.
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ReportKind::Nop,
            1 => ReportKind::Keyboard,
            2 => ReportKind::Mouse,
            254 => ReportKind::Delay,
            _ => ReportKind::End,
        }
    }

    /// Number of bytes sent to the host, `None` for records that are never transmitted
    pub const fn packet_len(self) -> Option<usize> {
        match self {
            ReportKind::Keyboard => Some(KEYBOARD_PACKET_LEN),
            ReportKind::Mouse => Some(MOUSE_PACKET_LEN),
            _ => None,
        }
    }
}

/// Keyboard payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier bitmask (bit 0 = left ctrl ... bit 7 = right gui)
    pub modifiers: u8,
    pub reserved: u8,
    /// Up to six simultaneously pressed key codes
    pub keys: [u8; 6],
    /// LED output byte, stored but not transmitted
    pub leds: u8,
}

impl KeyboardReport {
    pub const fn release() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; 6],
            leds: 0,
        }
    }
}

/// Mouse payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitfield (bit 0 = left, bit 1 = right, bit 2 = middle)
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub const fn movement(x: i8, y: i8) -> Self {
        Self {
            buttons: 0,
            x,
            y,
            wheel: 0,
        }
    }
}

/// Decoded view of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    Nop,
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Delay { ticks: u8 },
    End,
}

impl Report {
    pub fn decode(raw: &RawRecord) -> Self {
        match ReportKind::from_tag(raw[0]) {
            ReportKind::Nop => Report::Nop,
            ReportKind::Keyboard => {
                let mut keys = [0u8; 6];
                keys.copy_from_slice(&raw[3..9]);
                Report::Keyboard(KeyboardReport {
                    modifiers: raw[1],
                    reserved: raw[2],
                    keys,
                    leds: raw[9],
                })
            }
            ReportKind::Mouse => Report::Mouse(MouseReport {
                buttons: raw[1],
                x: raw[2] as i8,
                y: raw[3] as i8,
                wheel: raw[4] as i8,
            }),
            ReportKind::Delay => Report::Delay { ticks: raw[1] },
            ReportKind::End => Report::End,
        }
    }

    /// Encode into the 16-byte flash layout. Unused payload bytes are zero.
    pub fn encode(&self) -> RawRecord {
        let mut raw = [0u8; RECORD_SIZE];
        raw[0] = self.kind() as u8;
        match self {
            Report::Nop | Report::End => {}
            Report::Keyboard(kb) => {
                raw[1] = kb.modifiers;
                raw[2] = kb.reserved;
                raw[3..9].copy_from_slice(&kb.keys);
                raw[9] = kb.leds;
            }
            Report::Mouse(m) => {
                raw[1] = m.buttons;
                raw[2] = m.x as u8;
                raw[3] = m.y as u8;
                raw[4] = m.wheel as u8;
            }
            Report::Delay { ticks } => raw[1] = *ticks,
        }
        raw
    }

    pub const fn kind(&self) -> ReportKind {
        match self {
            Report::Nop => ReportKind::Nop,
            Report::Keyboard(_) => ReportKind::Keyboard,
            Report::Mouse(_) => ReportKind::Mouse,
            Report::Delay { .. } => ReportKind::Delay,
            Report::End => ReportKind::End,
        }
    }
}

/// Bytes of a stored record that go on the wire, if it is transmittable
pub fn hid_packet(raw: &RawRecord) -> Option<&[u8]> {
    ReportKind::from_tag(raw[0])
        .packet_len()
        .map(|len| &raw[..len])
}

/// Builder ran out of record slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

impl core::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("script does not fit the staging buffer")
    }
}

/// Bounded staging buffer for generated scripts
pub struct ScriptBuilder<const N: usize> {
    records: Vec<RawRecord, N>,
}

impl<const N: usize> ScriptBuilder<N> {
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn push(&mut self, report: Report) -> Result<(), CapacityError> {
        self.records
            .push(report.encode())
            .map_err(|_| CapacityError)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Records flattened into the byte stream written to flash
    pub fn as_bytes(&self) -> &[u8] {
        self.records.as_flattened()
    }
}

impl<const N: usize> Default for ScriptBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}
