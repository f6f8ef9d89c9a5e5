//! Wavetable banks.
//!
//! A bank is a flat file of 256-byte blocks, each one period of a waveform
//! as unsigned 8-bit samples. Long-note opcodes select a block by index;
//! the synthesis loop indexes into the block with the high byte of the
//! phase accumulator, so no bounds arithmetic is needed inside the mixer.

use std::fs;
use std::path::Path;

/// Samples per wavetable block.
pub const WAVETABLE_SIZE: usize = 256;

/// Errors raised while loading a wavetable bank.
#[derive(thiserror::Error, Debug)]
pub enum WavetableError {
    /// IO error from the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file holds less than one full block.
    #[error("wavetable file holds {0} bytes, need at least {WAVETABLE_SIZE}")]
    TooSmall(usize),
}

/// An owned bank of wavetables.
///
/// The bank outlives every voice that references a block by index; voices
/// never hold pointers into it.
#[derive(Clone, Debug)]
pub struct WavetableBank {
    data: Vec<u8>,
    num_tables: usize,
}

impl WavetableBank {
    /// Build a bank from raw bytes. A trailing partial block is ignored
    /// with a warning; a file smaller than one block is an error.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, WavetableError> {
        if data.len() < WAVETABLE_SIZE {
            return Err(WavetableError::TooSmall(data.len()));
        }
        if data.len() % WAVETABLE_SIZE != 0 {
            log::warn!(
                "wavetable data is {} bytes, not a multiple of {}; ignoring the tail",
                data.len(),
                WAVETABLE_SIZE
            );
        }
        let num_tables = data.len() / WAVETABLE_SIZE;
        Ok(WavetableBank { data, num_tables })
    }

    /// Load a bank from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WavetableError> {
        let bank = Self::from_bytes(fs::read(path)?)?;
        log::info!(
            "loaded {} wavetable{}",
            bank.len(),
            if bank.len() == 1 { "" } else { "s" }
        );
        Ok(bank)
    }

    /// Number of complete tables in the bank.
    pub fn len(&self) -> usize {
        self.num_tables
    }

    /// True when the bank holds no tables. Unreachable through the
    /// constructors, present for completeness.
    pub fn is_empty(&self) -> bool {
        self.num_tables == 0
    }

    /// Borrow one table by page index.
    pub fn table(&self, page: usize) -> Option<&[u8]> {
        if page < self.num_tables {
            let start = page * WAVETABLE_SIZE;
            Some(&self.data[start..start + WAVETABLE_SIZE])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_file() {
        let err = WavetableBank::from_bytes(vec![0; 100]).unwrap_err();
        assert!(matches!(err, WavetableError::TooSmall(100)));
    }

    #[test]
    fn single_table() {
        let bank = WavetableBank::from_bytes(vec![0x80; WAVETABLE_SIZE]).unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.table(0).unwrap().len(), WAVETABLE_SIZE);
        assert!(bank.table(1).is_none());
    }

    #[test]
    fn partial_tail_is_dropped() {
        let bank = WavetableBank::from_bytes(vec![1; WAVETABLE_SIZE * 2 + 17]).unwrap();
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn tables_index_independently() {
        let mut data = vec![0u8; WAVETABLE_SIZE * 2];
        data[WAVETABLE_SIZE..].fill(0xAA);
        let bank = WavetableBank::from_bytes(data).unwrap();
        assert_eq!(bank.table(0).unwrap()[0], 0);
        assert_eq!(bank.table(1).unwrap()[0], 0xAA);
    }
}
