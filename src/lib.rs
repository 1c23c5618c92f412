//! Metadata engine of a small block-addressed filesystem.
//!
//! On-disk layout, in blocks of `BLOCK_SIZE` bytes:
//! - 0: superblock
//! - inode table
//! - inode bitmap
//! - block bitmap
//! - data blocks (the first one holds the root directory's listing)
//!
//! `format` lays out an empty image, `FileSystem::mount` loads its metadata
//! into memory and `FileSystem::sync` writes the in-memory copy back.
//! Directory contents and file data are left to other components; they use
//! the layout constants, the inode codec and the allocation helpers exported here.

pub mod fs;

pub use fs::bitmap::Bitmap;
pub use fs::consts::*;
pub use fs::device::{BlockDevice, Durability, FileDevice, MemDevice};
pub use fs::error::{FsError as Error, Region, Result};
pub use fs::filesystem::{FileSystem, StatFs};
pub use fs::format::format;
pub use fs::geometry::Geometry;
pub use fs::layout::{DirEntry, Inode, InodeData};
pub use fs::store::MetadataStore;
pub use fs::superblock::Superblock;
