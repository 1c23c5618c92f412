//! Lays out an empty filesystem on a raw device.
//!
//! Blocks are written in device order, each region fully before the next:
//! superblock, inode table (root inode first), inode bitmap, block bitmap,
//! then the root directory's listing block. The first failing write aborts
//! the whole format; whatever was already written is left for the caller
//! to discard.

use crate::fs::bitmap::Bitmap;
use crate::fs::consts::{BLOCK_SIZE, INODE_SIZE, ROOT_INODE_ID, SUPERBLOCK_BLOCK};
use crate::fs::device::{BlockDevice, Durability};
use crate::fs::error::{FsError, Region, Result};
use crate::fs::geometry::Geometry;
use crate::fs::io::{write_block, write_span, zeroed};
use crate::fs::layout::{Inode, empty_listing, inode_location};
use crate::fs::superblock::Superblock;
use log::{debug, info};

/// Formats `dev` and returns the superblock that was written.
pub fn format<D: BlockDevice + ?Sized>(dev: &D) -> Result<Superblock> {
    let g = Geometry::compute(dev.size_bytes())?;
    info!(
        "format: {} blocks, {} inodes, data starts at block {}",
        g.total_blocks,
        g.total_inodes,
        g.data_start()
    );

    let sb = Superblock::fresh(&g);
    write_superblock(dev, &sb)?;
    write_inode_table(dev, &g)?;
    write_inode_bitmap(dev, &g)?;
    write_block_bitmap(dev, &g)?;
    write_root_listing(dev, &g)?;

    dev.flush().map_err(FsError::io(Region::DataBlocks))?;
    info!(
        "format: done, {} free inodes, {} free blocks",
        sb.nr_free_inodes, sb.nr_free_blocks
    );
    Ok(sb)
}

fn write_superblock<D: BlockDevice + ?Sized>(dev: &D, sb: &Superblock) -> Result<()> {
    debug!("format: writing superblock {:?}", sb);
    write_block(
        dev,
        SUPERBLOCK_BLOCK,
        &sb.encode(),
        Region::Superblock,
        Durability::WriteBack,
    )
}

fn write_inode_table<D: BlockDevice + ?Sized>(dev: &D, g: &Geometry) -> Result<()> {
    let mut table = zeroed(g.inode_table_blocks as usize * BLOCK_SIZE)?;
    let (block, offset) = inode_location(ROOT_INODE_ID);
    let at = (block - g.inode_table_start()) as usize * BLOCK_SIZE + offset;
    Inode::root(g.data_start()).encode_into(&mut table[at..at + INODE_SIZE]);

    debug!(
        "format: writing inode table, {} blocks",
        g.inode_table_blocks
    );
    write_span(
        dev,
        g.inode_table_start(),
        &table,
        Region::InodeTable,
        Durability::WriteBack,
    )
}

fn write_inode_bitmap<D: BlockDevice + ?Sized>(dev: &D, g: &Geometry) -> Result<()> {
    // only the root inode is taken
    let bitmap = Bitmap::with_used_prefix(g.inode_bitmap_blocks, g.total_inodes, 1)?;
    debug!(
        "format: writing inode bitmap, {} blocks",
        g.inode_bitmap_blocks
    );
    write_span(
        dev,
        g.inode_bitmap_start(),
        bitmap.as_bytes(),
        Region::InodeBitmap,
        Durability::WriteBack,
    )
}

fn write_block_bitmap<D: BlockDevice + ?Sized>(dev: &D, g: &Geometry) -> Result<()> {
    let bitmap =
        Bitmap::with_used_prefix(g.block_bitmap_blocks, g.total_blocks, g.reserved_blocks())?;
    debug!(
        "format: writing block bitmap, {} blocks, first {} marked used",
        g.block_bitmap_blocks,
        g.reserved_blocks()
    );
    write_span(
        dev,
        g.block_bitmap_start(),
        bitmap.as_bytes(),
        Region::BlockBitmap,
        Durability::WriteBack,
    )
}

fn write_root_listing<D: BlockDevice + ?Sized>(dev: &D, g: &Geometry) -> Result<()> {
    debug!(
        "format: writing empty root listing at block {}",
        g.data_start()
    );
    write_block(
        dev,
        g.data_start(),
        &empty_listing(),
        Region::DataBlocks,
        Durability::WriteBack,
    )
}
