pub const FS_MAGIC: u32 = 0xDEAD_CE11;

pub const BLOCK_SIZE: usize = 4096; // 4 KiB
pub const BITS_PER_BLOCK: usize = BLOCK_SIZE * 8;

pub const SUPERBLOCK_BLOCK: u32 = 0;
pub const ROOT_INODE_ID: u32 = 0;

// A device must hold strictly more blocks than this to be formatted.
pub const MIN_BLOCKS: u32 = 100;

pub const INLINE_DATA_LEN: usize = 32;
pub const INODE_SIZE: usize = 9 * 4 + INLINE_DATA_LEN; // 68 B
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub const FILENAME_LEN: usize = 255;
pub const DIR_ENTRY_SIZE: usize = 4 + FILENAME_LEN; // inode id + name
pub const MAX_SUBFILES: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

// File type and permission bits, POSIX values
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;
pub const ROOT_MODE: u32 = S_IFDIR | 0o755;
