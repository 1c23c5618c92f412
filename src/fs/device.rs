use crate::fs::consts::BLOCK_SIZE;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

/// Whether a block write must reach stable storage before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    WriteThrough,
    /// Marked dirty; persisted by a later `flush`.
    WriteBack,
}

impl Durability {
    pub fn from_wait(wait: bool) -> Self {
        if wait {
            Durability::WriteThrough
        } else {
            Durability::WriteBack
        }
    }
}

/// Block-level storage underneath the filesystem.
pub trait BlockDevice: Send + Sync {
    /// Returns the number of whole blocks on the device.
    fn num_blocks(&self) -> u64;

    /// Reads block `block_id`. `buf.len()` must be `BLOCK_SIZE`.
    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> io::Result<()>;

    /// Writes block `block_id`. `buf.len()` must be `BLOCK_SIZE`.
    fn write_block(&self, block_id: u32, buf: &[u8], durability: Durability) -> io::Result<()>;

    /// Persists every write-back block.
    fn flush(&self) -> io::Result<()>;

    fn size_bytes(&self) -> u64 {
        self.num_blocks() * BLOCK_SIZE as u64
    }
}

fn check_block(block_id: u32, num_blocks: u64, len: usize) -> io::Result<()> {
    if block_id as u64 >= num_blocks {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("block {block_id} beyond end of device ({num_blocks} blocks)"),
        ));
    }
    if len != BLOCK_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer of {len} bytes is not one block"),
        ));
    }
    Ok(())
}

/// Image file or raw block device.
pub struct FileDevice {
    inner: Mutex<File>,
    bytes: u64,
}

impl FileDevice {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(file)
    }

    /// Seeking to the end works for regular files and block devices alike.
    pub fn from_file(mut file: File) -> io::Result<Self> {
        let bytes = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner: Mutex::new(file),
            bytes,
        })
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "device lock poisoned"))
    }
}

impl BlockDevice for FileDevice {
    fn num_blocks(&self) -> u64 {
        self.bytes / BLOCK_SIZE as u64
    }

    fn size_bytes(&self) -> u64 {
        self.bytes
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> io::Result<()> {
        check_block(block_id, self.num_blocks(), buf.len())?;
        let mut f = self.lock()?;
        f.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        f.read_exact(buf)
    }

    fn write_block(&self, block_id: u32, buf: &[u8], durability: Durability) -> io::Result<()> {
        check_block(block_id, self.num_blocks(), buf.len())?;
        let mut f = self.lock()?;
        f.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        f.write_all(buf)?;
        if durability == Durability::WriteThrough {
            f.sync_data()?;
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        let mut f = self.lock()?;
        f.flush()?;
        f.sync_data()
    }
}

#[derive(Default)]
struct MemState {
    data: Vec<u8>,
    dirty: HashSet<u32>,
    fail_reads: HashSet<u32>,
    fail_writes: HashSet<u32>,
}

/// RAM disk. Can be told to fail specific blocks.
pub struct MemDevice {
    inner: Mutex<MemState>,
    num_blocks: u64,
}

impl MemDevice {
    pub fn new(num_blocks: u64) -> Self {
        Self::with_bytes(num_blocks * BLOCK_SIZE as u64)
    }

    /// A device of `bytes` bytes; a trailing partial block is unreachable.
    pub fn with_bytes(bytes: u64) -> Self {
        Self {
            inner: Mutex::new(MemState {
                data: vec![0u8; bytes as usize],
                ..MemState::default()
            }),
            num_blocks: bytes / BLOCK_SIZE as u64,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemState> {
        // A panicking test thread must not hide the image from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_reads_of(&self, block_id: u32) {
        self.state().fail_reads.insert(block_id);
    }

    pub fn fail_writes_of(&self, block_id: u32) {
        self.state().fail_writes.insert(block_id);
    }

    pub fn heal(&self) {
        let mut s = self.state();
        s.fail_reads.clear();
        s.fail_writes.clear();
    }

    /// Blocks written back but not flushed yet.
    pub fn dirty_blocks(&self) -> usize {
        self.state().dirty.len()
    }

    /// Copy of one raw block, bypassing failure injection.
    pub fn peek(&self, block_id: u32) -> Vec<u8> {
        let start = block_id as usize * BLOCK_SIZE;
        self.state().data[start..start + BLOCK_SIZE].to_vec()
    }

    /// Overwrites raw bytes, bypassing failure injection.
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        self.state().data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockDevice for MemDevice {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> io::Result<()> {
        check_block(block_id, self.num_blocks, buf.len())?;
        let s = self.state();
        if s.fail_reads.contains(&block_id) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "injected read failure",
            ));
        }
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&s.data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &[u8], durability: Durability) -> io::Result<()> {
        check_block(block_id, self.num_blocks, buf.len())?;
        let mut s = self.state();
        if s.fail_writes.contains(&block_id) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            ));
        }
        let start = block_id as usize * BLOCK_SIZE;
        s.data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        match durability {
            Durability::WriteThrough => s.dirty.remove(&block_id),
            Durability::WriteBack => s.dirty.insert(block_id),
        };
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.state().dirty.clear();
        Ok(())
    }
}
