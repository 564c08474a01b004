//! Bit vector used to track slot occupancy
//!
//! Bit `i` lives in byte `i / 8` at bit `i % 8`, least significant bit first.
//! The slot allocator uses `1` for a free slot and `0` for a used one, but
//! nothing in here knows about that polarity.

use crate::error::{Error, Result};
use std::fmt;

/// Number of bits stored per byte
pub const BITS_PER_BYTE: usize = 8;

/// Bytes needed to hold `bits` flags
pub const fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(BITS_PER_BYTE)
}

fn check_pos(bytes: &[u8], pos: usize) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::EmptyBitmap);
    }
    let len_bits = bytes.len() * BITS_PER_BYTE;
    if pos >= len_bits {
        return Err(Error::BitOutOfRange { pos, len_bits });
    }
    Ok(())
}

/// Find the position of the first bit equal to `value`
///
/// Returns `Ok(None)` when no bit matches.
pub fn find_first(bytes: &[u8], value: bool) -> Result<Option<usize>> {
    if bytes.is_empty() {
        return Err(Error::EmptyBitmap);
    }

    // A byte holding only the wrong bit value can be skipped whole
    let skip = if value { 0x00 } else { 0xFF };

    let found = bytes
        .iter()
        .enumerate()
        .find(|(_, byte)| **byte != skip)
        .map(|(index, &byte)| {
            let bits = if value { byte } else { !byte };
            index * BITS_PER_BYTE + bits.trailing_zeros() as usize
        });

    Ok(found)
}

/// Set the bit at `pos` to 1
pub fn set(bytes: &mut [u8], pos: usize) -> Result<()> {
    check_pos(bytes, pos)?;
    bytes[pos / BITS_PER_BYTE] |= 1 << (pos % BITS_PER_BYTE);
    Ok(())
}

/// Clear the bit at `pos` to 0
pub fn clear(bytes: &mut [u8], pos: usize) -> Result<()> {
    check_pos(bytes, pos)?;
    bytes[pos / BITS_PER_BYTE] &= !(1 << (pos % BITS_PER_BYTE));
    Ok(())
}

/// Read the bit at `pos`
pub fn test(bytes: &[u8], pos: usize) -> Result<bool> {
    check_pos(bytes, pos)?;
    Ok((bytes[pos / BITS_PER_BYTE] >> (pos % BITS_PER_BYTE)) & 0x01 == 1)
}

/// Owned, growable bit vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    bytes: Vec<u8>,
}

impl BitVector {
    /// Create a vector of `len_bytes` bytes with every bit set to `fill`
    pub fn new(len_bytes: usize, fill: bool) -> Result<Self> {
        if len_bytes == 0 {
            return Err(Error::EmptyBitmap);
        }
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len_bytes)
            .map_err(|_| Error::OutOfMemory { bytes: len_bytes })?;
        bytes.resize(len_bytes, if fill { 0xFF } else { 0x00 });
        Ok(Self { bytes })
    }

    /// Append `extra_bytes` bytes with every new bit set to `fill`
    ///
    /// On failure the vector is left untouched.
    pub fn try_grow(&mut self, extra_bytes: usize, fill: bool) -> Result<()> {
        self.bytes
            .try_reserve_exact(extra_bytes)
            .map_err(|_| Error::OutOfMemory { bytes: extra_bytes })?;
        let new_len = self.bytes.len() + extra_bytes;
        self.bytes.resize(new_len, if fill { 0xFF } else { 0x00 });
        Ok(())
    }

    pub fn find_first(&self, value: bool) -> Result<Option<usize>> {
        find_first(&self.bytes, value)
    }

    pub fn set(&mut self, pos: usize) -> Result<()> {
        set(&mut self.bytes, pos)
    }

    pub fn clear(&mut self, pos: usize) -> Result<()> {
        clear(&mut self.bytes, pos)
    }

    pub fn test(&self, pos: usize) -> Result<bool> {
        test(&self.bytes, pos)
    }

    /// Set every bit in `range` to 1
    pub fn set_range(&mut self, range: std::ops::Range<usize>) -> Result<()> {
        for pos in range {
            self.set(pos)?;
        }
        Ok(())
    }

    /// Length in bytes
    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Length in bits
    pub fn len_bits(&self) -> usize {
        self.bytes.len() * BITS_PER_BYTE
    }

    /// Number of bits set to 1
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for BitVector {
    /// Every bit as `0`/`1`, in groups of four
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..self.len_bits() {
            let bit = (self.bytes[pos / BITS_PER_BYTE] >> (pos % BITS_PER_BYTE)) & 0x01;
            write!(f, "{}", bit)?;
            if (pos + 1) % 4 == 0 {
                f.write_str("  ")?;
            }
        }
        Ok(())
    }
}
