use std::fmt;
use std::io;

/// On-disk region an I/O failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Superblock,
    InodeTable,
    InodeBitmap,
    BlockBitmap,
    DataBlocks,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Superblock => "superblock",
            Region::InodeTable => "inode table",
            Region::InodeBitmap => "inode bitmap",
            Region::BlockBitmap => "block bitmap",
            Region::DataBlocks => "data blocks",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Device too small, or the layout leaves no data blocks.
    #[error("device too small: {blocks} blocks (need more than {min})", min = crate::fs::consts::MIN_BLOCKS)]
    Sizing { blocks: u64 },

    #[error("I/O error in {region}: {source}")]
    Io {
        region: Region,
        #[source]
        source: io::Error,
    },

    #[error("wrong magic number {found:#x}")]
    InvalidMagic { found: u32 },

    /// No free bit left. Expected by allocators, not fatal.
    #[error("no free entry left in bitmap")]
    AllocationExhausted,

    #[error("index {index} out of range (limit {len})")]
    OutOfRange { index: u64, len: u64 },

    #[error("cannot allocate {bytes} bytes for in-memory metadata")]
    AllocationFailure { bytes: usize },
}

impl FsError {
    pub(crate) fn io(region: Region) -> impl FnOnce(io::Error) -> FsError {
        move |source| FsError::Io { region, source }
    }

    /// Region of a failed I/O, if this is an I/O error.
    pub fn region(&self) -> Option<Region> {
        match self {
            FsError::Io { region, .. } => Some(*region),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
