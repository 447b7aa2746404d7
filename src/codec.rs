//! Hex ASCII codec used by the console
//!
//! Payloads arrive as hex digits and binary responses leave as lowercase hex.

use heapless::String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// A character outside `0-9a-fA-F`
    InvalidDigit,
    /// Output buffer smaller than the decoded payload
    BufferTooSmall,
}

impl core::fmt::Display for HexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HexError::InvalidDigit => f.write_str("invalid hex digit"),
            HexError::BufferTooSmall => f.write_str("hex payload too large"),
        }
    }
}

/// Decode hex digits into `out`, returning the number of bytes written.
///
/// An odd trailing digit is dropped.
pub fn decode_into(digits: &[u8], out: &mut [u8]) -> Result<usize, HexError> {
    let len = digits.len() / 2;
    if len > out.len() {
        return Err(HexError::BufferTooSmall);
    }
    ::hex::decode_to_slice(&digits[..len * 2], &mut out[..len]).map_err(|_| HexError::InvalidDigit)?;
    Ok(len)
}

/// Encode `bytes` as lowercase hex. `N` must hold `2 * bytes.len()` characters.
pub fn encode<const N: usize>(bytes: &[u8]) -> Result<String<N>, HexError> {
    let mut out = String::new();
    for &b in bytes {
        let mut pair = [0u8; 2];
        ::hex::encode_to_slice([b], &mut pair).map_err(|_| HexError::BufferTooSmall)?;
        for c in pair {
            out.push(c as char).map_err(|_| HexError::BufferTooSmall)?;
        }
    }
    Ok(out)
}
