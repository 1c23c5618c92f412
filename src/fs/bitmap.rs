//! Free-space bitmaps for inodes and blocks.
//!
//! A bitmap covers a whole number of on-disk blocks and is handled as one flat
//! bit vector. Bit `i` lives in byte `i / 8` at position `i % 8` (LSB first).
//! A set bit means free, a clear bit means in use. Bits past the logical
//! length only pad the last block; they stay clear so they are never handed out.

use crate::fs::consts::{BITS_PER_BLOCK, BLOCK_SIZE};
use crate::fs::error::{FsError, Result};
use crate::fs::io::zeroed;

fn check_capacity(len: u32, bits: u64) -> Result<()> {
    if len as u64 > bits {
        return Err(FsError::OutOfRange {
            index: len as u64,
            len: bits,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    len: u32,
}

impl Bitmap {
    /// A bitmap of `blocks` blocks tracking `len` units, where the first
    /// `used` units are taken and the rest are free.
    pub fn with_used_prefix(blocks: u32, len: u32, used: u32) -> Result<Self> {
        check_capacity(len, blocks as u64 * BITS_PER_BLOCK as u64)?;
        let mut bytes = zeroed(blocks as usize * BLOCK_SIZE)?;

        let used = used.min(len) as usize;
        let len_bits = len as usize;
        // whole free bytes, then the ragged edges bit by bit
        let full_start = used.div_ceil(8);
        let full_end = len_bits / 8;
        if full_start < full_end {
            bytes[full_start..full_end].fill(0xff);
            for bit in used..full_start * 8 {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
            for bit in full_end * 8..len_bits {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        } else {
            for bit in used..len_bits {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }

        Ok(Self { bytes, len })
    }

    /// Wraps bytes read back from disk. Padding bits are forced to in-use.
    pub fn from_bytes(bytes: Vec<u8>, len: u32) -> Result<Self> {
        check_capacity(len, bytes.len() as u64 * 8)?;
        let mut bitmap = Self { bytes, len };
        bitmap.seal_padding();
        Ok(bitmap)
    }

    fn seal_padding(&mut self) {
        let len = self.len as usize;
        let first_full = len.div_ceil(8);
        if len % 8 != 0 {
            self.bytes[len / 8] &= (1u8 << (len % 8)) - 1;
        }
        self.bytes[first_full..].fill(0);
    }

    /// Number of logical units tracked.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of on-disk blocks backing the bitmap.
    pub fn blocks(&self) -> u32 {
        (self.bytes.len() / BLOCK_SIZE) as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn check(&self, index: u32) -> Result<(usize, u8)> {
        if index >= self.len {
            return Err(FsError::OutOfRange {
                index: index as u64,
                len: self.len as u64,
            });
        }
        Ok((index as usize / 8, 1u8 << (index % 8)))
    }

    /// Returns true when unit `index` is free.
    pub fn test(&self, index: u32) -> Result<bool> {
        let (byte, mask) = self.check(index)?;
        Ok(self.bytes[byte] & mask != 0)
    }

    pub fn set_used(&mut self, index: u32) -> Result<()> {
        let (byte, mask) = self.check(index)?;
        self.bytes[byte] &= !mask;
        Ok(())
    }

    pub fn set_free(&mut self, index: u32) -> Result<()> {
        let (byte, mask) = self.check(index)?;
        self.bytes[byte] |= mask;
        Ok(())
    }

    /// Lowest free index.
    pub fn find_first_free(&self) -> Result<u32> {
        let limit = (self.len as usize).div_ceil(8);
        self.bytes[..limit]
            .iter()
            .position(|&b| b != 0)
            .map(|i| (i * 8) as u32 + self.bytes[i].trailing_zeros())
            .filter(|&idx| idx < self.len)
            .ok_or(FsError::AllocationExhausted)
    }

    pub fn count_free(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }
}
