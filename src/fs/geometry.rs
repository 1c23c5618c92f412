//! Partitioning of a device's block address space into fixed regions.
//!
//! ```text
//! | 0 | inode table | inode bitmap | block bitmap | data blocks ... |
//! ```

use crate::fs::consts::{BITS_PER_BLOCK, BLOCK_SIZE, INODES_PER_BLOCK, MIN_BLOCKS};
use crate::fs::error::{FsError, Result};

/// Region sizes of a filesystem image, in blocks unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub total_blocks: u32,
    pub total_inodes: u32,
    pub inode_table_blocks: u32,
    pub inode_bitmap_blocks: u32,
    pub block_bitmap_blocks: u32,
    pub data_blocks: u32,
}

impl Geometry {
    /// Computes the layout for a device of `device_bytes` bytes.
    /// Any trailing partial block is ignored.
    pub fn compute(device_bytes: u64) -> Result<Self> {
        let total_blocks = device_bytes / BLOCK_SIZE as u64;
        if total_blocks <= MIN_BLOCKS as u64 || total_blocks > u32::MAX as u64 {
            return Err(FsError::Sizing {
                blocks: total_blocks,
            });
        }

        let per_block = INODES_PER_BLOCK as u64;
        let total_inodes = total_blocks.div_ceil(per_block) * per_block;
        let inode_table_blocks = total_inodes / per_block;
        let inode_bitmap_blocks = total_inodes.div_ceil(BITS_PER_BLOCK as u64);
        let block_bitmap_blocks = total_blocks.div_ceil(BITS_PER_BLOCK as u64);

        let metadata = 1 + inode_table_blocks + inode_bitmap_blocks + block_bitmap_blocks;
        if metadata >= total_blocks || total_inodes > u32::MAX as u64 {
            return Err(FsError::Sizing {
                blocks: total_blocks,
            });
        }

        Ok(Self {
            total_blocks: total_blocks as u32,
            total_inodes: total_inodes as u32,
            inode_table_blocks: inode_table_blocks as u32,
            inode_bitmap_blocks: inode_bitmap_blocks as u32,
            block_bitmap_blocks: block_bitmap_blocks as u32,
            data_blocks: (total_blocks - metadata) as u32,
        })
    }

    pub fn inode_table_start(&self) -> u32 {
        1
    }

    pub fn inode_bitmap_start(&self) -> u32 {
        self.inode_table_start() + self.inode_table_blocks
    }

    pub fn block_bitmap_start(&self) -> u32 {
        self.inode_bitmap_start() + self.inode_bitmap_blocks
    }

    /// First data block; reserved for the root directory's listing.
    pub fn data_start(&self) -> u32 {
        self.block_bitmap_start() + self.block_bitmap_blocks
    }

    /// Blocks in use right after format: all metadata plus the root's data block.
    pub fn reserved_blocks(&self) -> u32 {
        self.data_start() + 1
    }
}
