use crate::fs::consts::BLOCK_SIZE;
use crate::fs::device::{BlockDevice, Durability};
use crate::fs::error::{FsError, Region, Result};

/// Zero-filled buffer that reports allocation failure instead of aborting.
pub(crate) fn zeroed(bytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| FsError::AllocationFailure { bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

pub fn read_block<D: BlockDevice + ?Sized>(
    dev: &D,
    block_id: u32,
    region: Region,
) -> Result<Vec<u8>> {
    let mut buf = zeroed(BLOCK_SIZE)?;
    dev.read_block(block_id, &mut buf)
        .map_err(FsError::io(region))?;
    Ok(buf)
}

pub fn write_block<D: BlockDevice + ?Sized>(
    dev: &D,
    block_id: u32,
    buf: &[u8],
    region: Region,
    durability: Durability,
) -> Result<()> {
    dev.write_block(block_id, buf, durability)
        .map_err(FsError::io(region))
}

/// Reads `count` consecutive blocks starting at `start` into one buffer.
pub fn read_span<D: BlockDevice + ?Sized>(
    dev: &D,
    start: u32,
    count: u32,
    region: Region,
) -> Result<Vec<u8>> {
    let mut buf = zeroed(count as usize * BLOCK_SIZE)?;
    for (i, chunk) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
        dev.read_block(start + i as u32, chunk)
            .map_err(FsError::io(region))?;
    }
    Ok(buf)
}

/// Writes `buf` (a whole number of blocks) starting at block `start`.
/// Stops at the first failing block; earlier blocks stay written.
pub fn write_span<D: BlockDevice + ?Sized>(
    dev: &D,
    start: u32,
    buf: &[u8],
    region: Region,
    durability: Durability,
) -> Result<()> {
    debug_assert_eq!(buf.len() % BLOCK_SIZE, 0);
    for (i, chunk) in buf.chunks_exact(BLOCK_SIZE).enumerate() {
        dev.write_block(start + i as u32, chunk, durability)
            .map_err(FsError::io(region))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::device::MemDevice;

    #[test]
    fn span_round_trip() {
        let dev = MemDevice::new(8);
        let mut data = vec![0u8; 3 * BLOCK_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i / BLOCK_SIZE) as u8 + 1;
        }
        write_span(&dev, 2, &data, Region::DataBlocks, Durability::WriteThrough).unwrap();
        assert_eq!(dev.peek(1), vec![0u8; BLOCK_SIZE]);
        assert_eq!(dev.peek(4), vec![3u8; BLOCK_SIZE]);
        assert_eq!(read_span(&dev, 2, 3, Region::DataBlocks).unwrap(), data);
    }

    #[test]
    fn failure_names_the_region() {
        let dev = MemDevice::new(8);
        dev.fail_writes_of(3);
        let data = vec![9u8; 2 * BLOCK_SIZE];
        let err =
            write_span(&dev, 2, &data, Region::BlockBitmap, Durability::WriteBack).unwrap_err();
        assert_eq!(err.region(), Some(Region::BlockBitmap));
        // the block before the failure is not rolled back
        assert_eq!(dev.peek(2), vec![9u8; BLOCK_SIZE]);

        dev.fail_reads_of(5);
        let err = read_span(&dev, 4, 2, Region::InodeTable).unwrap_err();
        assert!(matches!(
            err,
            FsError::Io {
                region: Region::InodeTable,
                ..
            }
        ));
    }
}
