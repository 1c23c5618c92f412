use crate::fs::consts::{BLOCK_SIZE, FS_MAGIC};
use crate::fs::error::{FsError, Result};
use crate::fs::geometry::Geometry;

// Structure that represents the filesystem's superblock - 32 B, rest of block 0 is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u32,            // 4 B (offset 0..3)
    pub nr_blocks: u32,        // 4 B (offset 4..7)
    pub nr_inodes: u32,        // 4 B (offset 8..11)
    pub nr_istore_blocks: u32, // 4 B (offset 12..15)
    pub nr_ifree_blocks: u32,  // 4 B (offset 16..19)
    pub nr_bfree_blocks: u32,  // 4 B (offset 20..23)
    pub nr_free_inodes: u32,   // 4 B (offset 24..27)
    pub nr_free_blocks: u32,   // 4 B (offset 28..31)
}

pub const SUPERBLOCK_LEN: usize = 8 * 4;

fn get_u32(buf: &[u8], field: usize) -> u32 {
    let at = field * 4;
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl Superblock {
    /// Superblock of a freshly formatted image: only the root inode and
    /// the root's data block are taken.
    pub fn fresh(g: &Geometry) -> Self {
        Self {
            magic: FS_MAGIC,
            nr_blocks: g.total_blocks,
            nr_inodes: g.total_inodes,
            nr_istore_blocks: g.inode_table_blocks,
            nr_ifree_blocks: g.inode_bitmap_blocks,
            nr_bfree_blocks: g.block_bitmap_blocks,
            nr_free_inodes: g.total_inodes - 1,
            nr_free_blocks: g.data_blocks - 1,
        }
    }

    fn fields(&self) -> [u32; 8] {
        [
            self.magic,
            self.nr_blocks,
            self.nr_inodes,
            self.nr_istore_blocks,
            self.nr_ifree_blocks,
            self.nr_bfree_blocks,
            self.nr_free_inodes,
            self.nr_free_blocks,
        ]
    }

    /// Packs the superblock into `block`, zeroing everything past the fields.
    pub fn encode_into(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), BLOCK_SIZE);
        block.fill(0);
        for (i, v) in self.fields().iter().enumerate() {
            block[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_SIZE];
        self.encode_into(&mut block);
        block
    }

    /// Unpacks block 0. The magic number is the only integrity check.
    pub fn decode(block: &[u8]) -> Result<Self> {
        debug_assert!(block.len() >= SUPERBLOCK_LEN);
        let magic = get_u32(block, 0);
        if magic != FS_MAGIC {
            return Err(FsError::InvalidMagic { found: magic });
        }

        Ok(Self {
            magic,
            nr_blocks: get_u32(block, 1),
            nr_inodes: get_u32(block, 2),
            nr_istore_blocks: get_u32(block, 3),
            nr_ifree_blocks: get_u32(block, 4),
            nr_bfree_blocks: get_u32(block, 5),
            nr_free_inodes: get_u32(block, 6),
            nr_free_blocks: get_u32(block, 7),
        })
    }

    /// Rebuilds the geometry recorded in this superblock.
    pub fn geometry(&self) -> Geometry {
        let metadata = 1
            + self.nr_istore_blocks as u64
            + self.nr_ifree_blocks as u64
            + self.nr_bfree_blocks as u64;
        Geometry {
            total_blocks: self.nr_blocks,
            total_inodes: self.nr_inodes,
            inode_table_blocks: self.nr_istore_blocks,
            inode_bitmap_blocks: self.nr_ifree_blocks,
            block_bitmap_blocks: self.nr_bfree_blocks,
            data_blocks: (self.nr_blocks as u64).saturating_sub(metadata) as u32,
        }
    }
}
