use crate::fs::bitmap::Bitmap;
use crate::fs::consts::{
    BLOCK_SIZE, FILENAME_LEN, FS_MAGIC, INODE_SIZE, ROOT_INODE_ID, SUPERBLOCK_BLOCK,
};
use crate::fs::device::{BlockDevice, Durability};
use crate::fs::error::{FsError, Region, Result};
use crate::fs::geometry::Geometry;
use crate::fs::io::{read_block, read_span, write_block, write_span};
use crate::fs::layout::{Inode, inode_location};
use crate::fs::superblock::Superblock;
use log::{debug, info, trace, warn};
use spin::{Mutex, RwLock};
use std::sync::Arc;

/// Filesystem statistics, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub fs_type: u32,
    pub block_size: u32,
    pub blocks: u32,
    pub free_blocks: u32,
    pub available_blocks: u32,
    pub files: u32,
    pub free_files: u32,
    pub name_len: u32,
}

// In-memory mirror of the on-disk metadata. Bumping `generation` marks it dirty.
struct State {
    sb: Superblock,
    inode_bitmap: Bitmap,
    block_bitmap: Bitmap,
    root: Inode,
    generation: u64,
    synced: u64,
    released: bool,
}

/// A mounted filesystem image.
///
/// Mutations take the state's write lock; `sync` copies the state out under
/// the read lock and does its I/O after releasing it. Metadata writers hold
/// `io_lock` from snapshot to last write, so images reach the device in
/// generation order.
pub struct FileSystem<D: BlockDevice + ?Sized> {
    device: Arc<D>,
    geometry: Geometry,
    state: RwLock<State>,
    io_lock: Mutex<()>,
}

fn load_bitmap<D: BlockDevice + ?Sized>(
    dev: &D,
    start: u32,
    blocks: u32,
    len: u32,
    region: Region,
) -> Result<Bitmap> {
    let bytes = read_span(dev, start, blocks, region)?;
    Bitmap::from_bytes(bytes, len)
}

fn read_inode_from<D: BlockDevice + ?Sized>(dev: &D, sb: &Superblock, ino: u32) -> Result<Inode> {
    if ino >= sb.nr_inodes {
        return Err(FsError::OutOfRange {
            index: ino as u64,
            len: sb.nr_inodes as u64,
        });
    }
    let (block, offset) = inode_location(ino);
    let buf = read_block(dev, block, Region::InodeTable)?;
    Ok(Inode::decode(&buf[offset..offset + INODE_SIZE]))
}

impl<D: BlockDevice + ?Sized> FileSystem<D> {
    /// Loads the superblock and both bitmaps into memory.
    /// Nothing is retained if any step fails.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let block0 = read_block(&*device, SUPERBLOCK_BLOCK, Region::Superblock)?;
        let sb = Superblock::decode(&block0)?;
        let geometry = sb.geometry();
        // region counts past the end would overflow the region offsets
        if geometry.data_blocks == 0 {
            return Err(FsError::OutOfRange {
                index: 1
                    + sb.nr_istore_blocks as u64
                    + sb.nr_ifree_blocks as u64
                    + sb.nr_bfree_blocks as u64,
                len: sb.nr_blocks as u64,
            });
        }
        // free counters above their region size would break allocator accounting
        if sb.nr_free_inodes >= sb.nr_inodes {
            return Err(FsError::OutOfRange {
                index: sb.nr_free_inodes as u64,
                len: sb.nr_inodes as u64,
            });
        }
        if sb.nr_free_blocks >= geometry.data_blocks {
            return Err(FsError::OutOfRange {
                index: sb.nr_free_blocks as u64,
                len: geometry.data_blocks as u64,
            });
        }
        debug!("mount: superblock {:?}", sb);

        let inode_bitmap = load_bitmap(
            &*device,
            geometry.inode_bitmap_start(),
            sb.nr_ifree_blocks,
            sb.nr_inodes,
            Region::InodeBitmap,
        )?;
        let block_bitmap = load_bitmap(
            &*device,
            geometry.block_bitmap_start(),
            sb.nr_bfree_blocks,
            sb.nr_blocks,
            Region::BlockBitmap,
        )?;
        let root = read_inode_from(&*device, &sb, ROOT_INODE_ID)?;

        info!(
            "mount: {} blocks ({} free), {} inodes ({} free)",
            sb.nr_blocks, sb.nr_free_blocks, sb.nr_inodes, sb.nr_free_inodes
        );

        Ok(Self {
            device,
            geometry,
            state: RwLock::new(State {
                sb,
                inode_bitmap,
                block_bitmap,
                root,
                generation: 0,
                synced: 0,
                released: false,
            }),
            io_lock: Mutex::new(()),
        })
    }

    /// Writes the superblock mirror and both bitmaps back to their fixed
    /// locations. `wait` selects write-through over write-back.
    /// A failed block write stops the sync; blocks already written stay.
    pub fn sync(&self, wait: bool) -> Result<()> {
        let _io = self.io_lock.lock();
        let (generation, block0, ibits, bbits) = {
            let st = self.state.read();
            (
                st.generation,
                st.sb.encode(),
                st.inode_bitmap.as_bytes().to_vec(),
                st.block_bitmap.as_bytes().to_vec(),
            )
        };
        let durability = Durability::from_wait(wait);
        let dev = &*self.device;
        let g = &self.geometry;

        debug!("sync: generation {} ({:?})", generation, durability);
        write_block(
            dev,
            SUPERBLOCK_BLOCK,
            &block0,
            Region::Superblock,
            durability,
        )?;
        write_span(
            dev,
            g.inode_bitmap_start(),
            &ibits,
            Region::InodeBitmap,
            durability,
        )?;
        write_span(
            dev,
            g.block_bitmap_start(),
            &bbits,
            Region::BlockBitmap,
            durability,
        )?;

        let mut st = self.state.write();
        st.synced = st.synced.max(generation);
        Ok(())
    }

    /// Final write-through sync, then releases the in-memory state.
    pub fn unmount(self) -> Result<()> {
        let res = self.sync(true);
        self.state.write().released = true;
        if res.is_ok() {
            info!("unmount: metadata flushed");
        }
        res
    }

    /// True when the mirror holds changes not yet written by `sync`.
    pub fn is_dirty(&self) -> bool {
        let st = self.state.read();
        st.generation != st.synced
    }

    pub fn statfs(&self) -> StatFs {
        let sb = self.state.read().sb;
        StatFs {
            fs_type: FS_MAGIC,
            block_size: BLOCK_SIZE as u32,
            blocks: sb.nr_blocks,
            free_blocks: sb.nr_free_blocks,
            available_blocks: sb.nr_free_blocks,
            files: sb.nr_inodes.saturating_sub(sb.nr_free_inodes),
            free_files: sb.nr_free_inodes,
            name_len: FILENAME_LEN as u32,
        }
    }

    pub fn superblock(&self) -> Superblock {
        self.state.read().sb
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }

    /// Root directory inode, as of mount or the last write to inode 0.
    pub fn root(&self) -> Inode {
        self.state.read().root
    }

    /// Runs `f` against the inode bitmap under the read lock.
    pub fn with_inode_bitmap<R>(&self, f: impl FnOnce(&Bitmap) -> R) -> R {
        f(&self.state.read().inode_bitmap)
    }

    /// Runs `f` against the block bitmap under the read lock.
    pub fn with_block_bitmap<R>(&self, f: impl FnOnce(&Bitmap) -> R) -> R {
        f(&self.state.read().block_bitmap)
    }

    // Inode table

    pub fn read_inode(&self, ino: u32) -> Result<Inode> {
        let sb = self.superblock();
        read_inode_from(&*self.device, &sb, ino)
    }

    pub fn write_inode(&self, ino: u32, inode: &Inode, durability: Durability) -> Result<()> {
        let sb = self.superblock();
        if ino >= sb.nr_inodes {
            return Err(FsError::OutOfRange {
                index: ino as u64,
                len: sb.nr_inodes as u64,
            });
        }
        let (block, offset) = inode_location(ino);
        let _io = self.io_lock.lock();
        let mut buf = read_block(&*self.device, block, Region::InodeTable)?;
        inode.encode_into(&mut buf[offset..offset + INODE_SIZE]);
        write_block(&*self.device, block, &buf, Region::InodeTable, durability)?;

        if ino == ROOT_INODE_ID {
            self.state.write().root = *inode;
        }
        Ok(())
    }

    // Allocation (lowest free index first)

    pub fn alloc_inode(&self) -> Result<u32> {
        let mut st = self.state.write();
        let ino = st.inode_bitmap.find_first_free()?;
        st.inode_bitmap.set_used(ino)?;
        st.sb.nr_free_inodes = st.sb.nr_free_inodes.saturating_sub(1);
        st.generation += 1;
        trace!("alloc_inode: {}", ino);
        Ok(ino)
    }

    pub fn free_inode(&self, ino: u32) -> Result<()> {
        let mut st = self.state.write();
        if ino == ROOT_INODE_ID {
            return Err(FsError::OutOfRange {
                index: ino as u64,
                len: st.sb.nr_inodes as u64,
            });
        }
        if st.inode_bitmap.test(ino)? {
            return Ok(());
        }
        st.inode_bitmap.set_free(ino)?;
        st.sb.nr_free_inodes = st.sb.nr_free_inodes.saturating_add(1);
        st.generation += 1;
        trace!("free_inode: {}", ino);
        Ok(())
    }

    /// Returns the absolute block number of a newly taken data block.
    pub fn alloc_block(&self) -> Result<u32> {
        let mut st = self.state.write();
        let block = st.block_bitmap.find_first_free()?;
        st.block_bitmap.set_used(block)?;
        st.sb.nr_free_blocks = st.sb.nr_free_blocks.saturating_sub(1);
        st.generation += 1;
        trace!("alloc_block: {}", block);
        Ok(block)
    }

    pub fn free_block(&self, block: u32) -> Result<()> {
        let mut st = self.state.write();
        // metadata and the root listing stay allocated
        if block < self.geometry.reserved_blocks() {
            return Err(FsError::OutOfRange {
                index: block as u64,
                len: st.sb.nr_blocks as u64,
            });
        }
        if st.block_bitmap.test(block)? {
            return Ok(());
        }
        st.block_bitmap.set_free(block)?;
        st.sb.nr_free_blocks = st.sb.nr_free_blocks.saturating_add(1);
        st.generation += 1;
        trace!("free_block: {}", block);
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> Drop for FileSystem<D> {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        if st.released || st.generation == st.synced {
            return;
        }
        if let Err(e) = self.sync(true) {
            warn!("dropping mounted filesystem with unsynced metadata: {}", e);
        }
    }
}
