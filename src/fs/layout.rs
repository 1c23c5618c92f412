use crate::fs::consts::{
    BLOCK_SIZE, DIR_ENTRY_SIZE, FILENAME_LEN, INLINE_DATA_LEN, INODE_SIZE, INODES_PER_BLOCK,
    MAX_SUBFILES, ROOT_MODE, S_IFDIR, S_IFLNK, S_IFMT,
};

/// Trailing field of an inode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeData {
    /// Index block (or single data block) of the entity.
    Block(u32),
    /// Short symlink targets live in the record itself.
    Inline([u8; INLINE_DATA_LEN]),
}

// Structure that represents one inode - 68 B
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub mode: u32,       // 4 (offset 0)
    pub uid: u32,        // 4 (offset 4)
    pub gid: u32,        // 4 (offset 8)
    pub size: u32,       // 4 (offset 12)
    pub ctime: u32,      // 4 (offset 16)
    pub atime: u32,      // 4 (offset 20)
    pub mtime: u32,      // 4 (offset 24)
    pub blocks: u32,     // 4 (offset 28)
    pub nlink: u32,      // 4 (offset 32)
    pub data: InodeData, // 32 (offset 36..67)
}

const DATA_OFFSET: usize = 36;

fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Block (relative to the image) and byte offset of inode `ino`.
pub fn inode_location(ino: u32) -> (u32, usize) {
    let block = 1 + ino / INODES_PER_BLOCK as u32;
    let offset = (ino as usize % INODES_PER_BLOCK) * INODE_SIZE;
    (block, offset)
}

impl Inode {
    /// Root directory created by format: one listing block, `.` and `..` links.
    pub fn root(first_data_block: u32) -> Self {
        Self {
            mode: ROOT_MODE,
            uid: 0,
            gid: 0,
            size: BLOCK_SIZE as u32,
            ctime: 0,
            atime: 0,
            mtime: 0,
            blocks: 1,
            nlink: 2,
            data: InodeData::Block(first_data_block),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Whether this record keeps its payload inline.
    pub fn stores_inline(mode: u32, size: u32) -> bool {
        mode & S_IFMT == S_IFLNK && size as usize <= INLINE_DATA_LEN
    }

    pub fn block(&self) -> Option<u32> {
        match self.data {
            InodeData::Block(b) => Some(b),
            InodeData::Inline(_) => None,
        }
    }

    pub fn inline_data(&self) -> Option<&[u8]> {
        match &self.data {
            InodeData::Inline(d) => Some(&d[..(self.size as usize).min(INLINE_DATA_LEN)]),
            InodeData::Block(_) => None,
        }
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), INODE_SIZE);
        let head = [
            self.mode,
            self.uid,
            self.gid,
            self.size,
            self.ctime,
            self.atime,
            self.mtime,
            self.blocks,
            self.nlink,
        ];
        for (i, v) in head.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        let tail = &mut out[DATA_OFFSET..];
        tail.fill(0);
        match &self.data {
            InodeData::Block(b) => tail[..4].copy_from_slice(&b.to_le_bytes()),
            InodeData::Inline(d) => tail.copy_from_slice(d),
        }
    }

    pub fn decode(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), INODE_SIZE);
        let mode = get_u32(inp, 0);
        let size = get_u32(inp, 12);
        let data = if Self::stores_inline(mode, size) {
            let mut d = [0u8; INLINE_DATA_LEN];
            d.copy_from_slice(&inp[DATA_OFFSET..]);
            InodeData::Inline(d)
        } else {
            InodeData::Block(get_u32(inp, DATA_OFFSET))
        };

        Self {
            mode,
            uid: get_u32(inp, 4),
            gid: get_u32(inp, 8),
            size,
            ctime: get_u32(inp, 16),
            atime: get_u32(inp, 20),
            mtime: get_u32(inp, 24),
            blocks: get_u32(inp, 28),
            nlink: get_u32(inp, 32),
            data,
        }
    }
}

/// Slot of a directory listing block - 259 B.
/// A zero first name byte marks the end of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub inode_id: u32,            // 4 (offset 0)
    pub name: [u8; FILENAME_LEN], // 255 (offset 4..258), zero padded
}

impl DirEntry {
    pub const UNUSED: Self = Self {
        inode_id: 0,
        name: [0u8; FILENAME_LEN],
    };

    pub fn is_unused(&self) -> bool {
        self.name[0] == 0
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), DIR_ENTRY_SIZE);
        out[..4].copy_from_slice(&self.inode_id.to_le_bytes());
        out[4..].copy_from_slice(&self.name);
    }

    pub fn decode(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), DIR_ENTRY_SIZE);
        let mut name = [0u8; FILENAME_LEN];
        name.copy_from_slice(&inp[4..]);
        Self {
            inode_id: get_u32(inp, 0),
            name,
        }
    }
}

/// Encodes an empty directory listing: every slot unused.
pub fn empty_listing() -> Vec<u8> {
    let mut block = vec![0u8; BLOCK_SIZE];
    for slot in block.chunks_exact_mut(DIR_ENTRY_SIZE).take(MAX_SUBFILES) {
        DirEntry::UNUSED.encode_into(slot);
    }
    block
}

pub fn is_listing_empty(block: &[u8]) -> bool {
    block
        .chunks_exact(DIR_ENTRY_SIZE)
        .next()
        .map(|slot| DirEntry::decode(slot).is_unused())
        .unwrap_or(true)
}
