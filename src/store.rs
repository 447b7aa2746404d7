//! Persistent script store
//!
//! The script lives in a dedicated flash region. Writes always erase the
//! sectors they touch first, then program fixed-width units and read each
//! unit back before moving on. There is no rollback: a failed write leaves
//! whatever was programmed so far and the operator has to write again.

use embedded_storage::nor_flash::NorFlash;

use crate::config::PROGRAM_UNIT;
use crate::report::ERASED_BYTE;

/// Store failure, reported as-is by the write commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    EraseFailed,
    ProgramFailed,
    VerifyFailed,
    /// Write does not fit inside the script region
    OutOfRange,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::EraseFailed => f.write_str("flash erase failed"),
            StoreError::ProgramFailed => f.write_str("flash program failed"),
            StoreError::VerifyFailed => f.write_str("flash verify failed"),
            StoreError::OutOfRange => f.write_str("write outside script region"),
        }
    }
}

/// Byte-addressed script storage. Addresses are relative to the region base.
pub trait ScriptStore {
    /// Erase the blocks covering `[address, address + bytes.len())` and program `bytes`
    fn program(&mut self, address: u32, bytes: &[u8]) -> Result<(), StoreError>;

    /// Copy `buf.len()` bytes from `address`. Never fails: unreadable bytes read as erased.
    fn read(&mut self, address: u32, buf: &mut [u8]);

    /// Region size in bytes
    fn capacity(&self) -> u32;
}

/// Script store over a NOR flash region
pub struct FlashStore<F> {
    flash: F,
    base: u32,
    size: u32,
}

impl<F: NorFlash> FlashStore<F> {
    /// `base` and `size` must be aligned to `F::ERASE_SIZE`
    pub fn new(flash: F, base: u32, size: u32) -> Self {
        debug_assert!(base as usize % F::ERASE_SIZE == 0);
        debug_assert!(size as usize % F::ERASE_SIZE == 0);
        Self { flash, base, size }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn erase_span(&mut self, address: u32, len: u32) -> Result<(), StoreError> {
        let erase = F::ERASE_SIZE as u32;
        let start = self.base + address;
        let from = start - start % erase;
        // A zero-length write still clears the block holding `address`
        let end = (start + len).max(from + 1);
        let to = end.div_ceil(erase) * erase;
        debug!("store: erasing 0x{:x}..0x{:x}", from, to);
        self.flash.erase(from, to).map_err(|_| StoreError::EraseFailed)
    }
}

impl<F: NorFlash> ScriptStore for FlashStore<F> {
    fn program(&mut self, address: u32, bytes: &[u8]) -> Result<(), StoreError> {
        let len = u32::try_from(bytes.len()).map_err(|_| StoreError::OutOfRange)?;
        if address.checked_add(len).is_none_or(|end| end > self.size) {
            warn!("store: write of {} bytes at {} exceeds region", len, address);
            return Err(StoreError::OutOfRange);
        }

        self.erase_span(address, len)?;

        let mut offset = self.base + address;
        for chunk in bytes.chunks(PROGRAM_UNIT) {
            // Pad the tail with erased bytes so programming it is a no-op
            let mut unit = [ERASED_BYTE; PROGRAM_UNIT];
            unit[..chunk.len()].copy_from_slice(chunk);

            if self.flash.write(offset, &unit).is_err() {
                error!("store: program failed at 0x{:x}", offset);
                return Err(StoreError::ProgramFailed);
            }

            let mut readback = [0u8; PROGRAM_UNIT];
            if self.flash.read(offset, &mut readback).is_err() || readback[..chunk.len()] != *chunk {
                error!("store: verify failed at 0x{:x}", offset);
                return Err(StoreError::VerifyFailed);
            }

            offset += PROGRAM_UNIT as u32;
        }

        debug!("store: programmed {} bytes", len);
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) {
        let in_range = u32::try_from(buf.len())
            .ok()
            .and_then(|len| address.checked_add(len))
            .is_some_and(|end| end <= self.size);

        if !in_range || self.flash.read(self.base + address, buf).is_err() {
            buf.fill(ERASED_BYTE);
        }
    }

    fn capacity(&self) -> u32 {
        self.size
    }
}

impl<S: ScriptStore + ?Sized> ScriptStore for &mut S {
    fn program(&mut self, address: u32, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).program(address, bytes)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) {
        (**self).read(address, buf)
    }

    fn capacity(&self) -> u32 {
        (**self).capacity()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockFlash;
    use super::*;

    const REGION: u32 = 2048;

    fn store() -> FlashStore<MockFlash<4096>> {
        FlashStore::new(MockFlash::new(), 1024, REGION)
    }

    #[test]
    fn write_then_read_back() {
        let mut store = store();
        let data: [u8; 22] = core::array::from_fn(|i| i as u8 * 3);
        assert_eq!(store.program(0, &data), Ok(()));
        let mut back = [0u8; 22];
        store.read(0, &mut back);
        assert_eq!(back, data);
    }

    #[test]
    fn erase_clears_the_whole_block() {
        let mut store = store();
        store.program(0, &[0u8; 64]).unwrap();
        store.program(0, &[1, 2, 3, 4]).unwrap();

        let mut tail = [0u8; 4];
        store.read(60, &mut tail);
        assert_eq!(tail, [0xFF; 4]);
    }

    #[test]
    fn write_spanning_blocks_erases_both() {
        let mut store = store();
        assert_eq!(store.program(1020, &[0u8; 8]), Ok(()));
        assert_eq!(store.into_inner().erases, 1);

        let mut flash = MockFlash::<4096>::new();
        flash.data[1024 + 1500] = 0;
        let mut store = FlashStore::new(flash, 1024, REGION);
        store.program(1020, &[0u8; 8]).unwrap();
        let mut b = [0u8; 1];
        store.read(1500, &mut b);
        assert_eq!(b, [0xFF]);
    }

    #[test]
    fn empty_write_clears_first_block() {
        let mut store = store();
        store.program(0, &[0u8; 16]).unwrap();
        assert_eq!(store.program(0, &[]), Ok(()));
        let mut first = [0u8; 16];
        store.read(0, &mut first);
        assert_eq!(first, [0xFF; 16]);
    }

    #[test]
    fn erase_failure() {
        let mut flash = MockFlash::<4096>::new();
        flash.fail_erase = true;
        let mut store = FlashStore::new(flash, 1024, REGION);
        assert_eq!(store.program(0, &[1]), Err(StoreError::EraseFailed));
    }

    #[test]
    fn program_failure() {
        let mut flash = MockFlash::<4096>::new();
        flash.fail_write_at = Some(1024 + 4);
        let mut store = FlashStore::new(flash, 1024, REGION);
        assert_eq!(store.program(0, &[0u8; 12]), Err(StoreError::ProgramFailed));
    }

    #[test]
    fn verify_failure_keeps_earlier_units() {
        let mut flash = MockFlash::<4096>::new();
        flash.corrupt_at = Some(1024 + 8);
        let mut store = FlashStore::new(flash, 1024, REGION);
        assert_eq!(
            store.program(0, &[0x10u8; 16]),
            Err(StoreError::VerifyFailed)
        );
        let mut back = [0u8; 16];
        store.read(0, &mut back);
        assert_eq!(&back[..8], &[0x10; 8]);
        assert_eq!(&back[12..], &[0xFF; 4]);
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let mut store = store();
        assert_eq!(
            store.program(REGION - 4, &[0u8; 8]),
            Err(StoreError::OutOfRange)
        );
    }

    #[test]
    fn out_of_range_read_returns_erased() {
        let mut store = store();
        store.program(0, &[0u8; 4]).unwrap();
        let mut buf = [0u8; 8];
        store.read(REGION - 4, &mut buf);
        assert_eq!(buf, [0xFF; 8]);
    }
}
