mod common;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use common::{ONE_MIB, blocks, formatted, mounted};
use tinyfs::{
    BITS_PER_BLOCK, BlockDevice, Durability, Error, FileDevice, FileSystem, MemDevice, Region,
    Superblock,
};

/// RAM disk whose next superblock write, once armed, parks until released.
struct GatedDevice {
    inner: MemDevice,
    armed: AtomicBool,
    reached: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl BlockDevice for GatedDevice {
    fn num_blocks(&self) -> u64 {
        self.inner.num_blocks()
    }

    fn read_block(&self, block_id: u32, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: u32, buf: &[u8], durability: Durability) -> io::Result<()> {
        if block_id == 0 && self.armed.swap(false, Ordering::SeqCst) {
            self.reached.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.write_block(block_id, buf, durability)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn used_bit_survives_remount() {
    let (dev, fs) = mounted(ONE_MIB);
    let g = fs.geometry();
    // take inodes 1..=5 and blocks up to data_start + 5
    for _ in 0..5 {
        fs.alloc_inode().unwrap();
        fs.alloc_block().unwrap();
    }
    assert!(!fs.with_inode_bitmap(|b| b.test(5)).unwrap());
    fs.sync(true).unwrap();
    let sb = fs.superblock();
    drop(fs);

    let again = FileSystem::mount(dev).unwrap();
    assert_eq!(again.superblock(), sb);
    assert!(!again.with_inode_bitmap(|b| b.test(5)).unwrap());
    assert!(again.with_inode_bitmap(|b| b.test(6)).unwrap());
    assert!(
        !again
            .with_block_bitmap(|b| b.test(g.data_start() + 5))
            .unwrap()
    );
    assert_eq!(again.alloc_inode().unwrap(), 6);
}

#[test]
fn freed_bit_survives_remount() {
    let (dev, fs) = mounted(ONE_MIB);
    let ino = fs.alloc_inode().unwrap();
    fs.sync(true).unwrap();
    fs.free_inode(ino).unwrap();
    fs.unmount().unwrap();

    let again = FileSystem::mount(dev).unwrap();
    assert!(again.with_inode_bitmap(|b| b.test(ino)).unwrap());
    assert_eq!(
        again.superblock().nr_free_inodes,
        again.superblock().nr_inodes - 1
    );
}

#[test]
fn wait_flag_selects_durability() {
    let (dev, fs) = mounted(ONE_MIB);
    let g = fs.geometry();
    fs.alloc_block().unwrap();

    fs.sync(false).unwrap();
    let written = 1 + g.inode_bitmap_blocks + g.block_bitmap_blocks;
    assert_eq!(dev.dirty_blocks(), written as usize);
    assert!(!fs.is_dirty());

    fs.sync(true).unwrap();
    assert_eq!(dev.dirty_blocks(), 0);
}

#[test]
fn failed_sync_keeps_mirror_usable() {
    let (dev, fs) = mounted(ONE_MIB);
    let g = fs.geometry();
    fs.alloc_inode().unwrap();
    let mirror = fs.superblock();

    dev.fail_writes_of(g.inode_bitmap_start());
    let err = fs.sync(true).unwrap_err();
    assert!(matches!(
        err,
        Error::Io {
            region: Region::InodeBitmap,
            ..
        }
    ));
    // superblock went out before the failure and is not rolled back
    assert_eq!(Superblock::decode(&dev.peek(0)).unwrap(), mirror);
    assert!(fs.is_dirty());
    assert_eq!(fs.superblock(), mirror);

    dev.heal();
    fs.sync(true).unwrap();
    assert!(!fs.is_dirty());
}

#[test]
fn drop_flushes_dirty_state() {
    let (dev, fs) = mounted(ONE_MIB);
    let b = fs.alloc_block().unwrap();
    drop(fs);

    let again = FileSystem::mount(dev).unwrap();
    assert!(!again.with_block_bitmap(|bm| bm.test(b)).unwrap());
}

#[test]
fn unmount_reports_failure() {
    let (dev, fs) = mounted(ONE_MIB);
    fs.alloc_inode().unwrap();
    dev.fail_writes_of(0);
    assert!(matches!(
        fs.unmount(),
        Err(Error::Io {
            region: Region::Superblock,
            ..
        })
    ));
}

#[test]
fn counters_agree_between_format_and_mount() {
    let (dev, sb) = formatted(ONE_MIB);
    let fs = FileSystem::mount(Arc::clone(&dev)).unwrap();
    assert_eq!(fs.statfs().free_blocks, sb.nr_free_blocks);
    fs.sync(true).unwrap();
    assert_eq!(Superblock::decode(&dev.peek(0)).unwrap(), sb);
}

#[test]
fn image_file_lifecycle() {
    let path = std::env::temp_dir().join(format!("tinyfs-sync-{}.img", std::process::id()));
    let f = std::fs::File::create(&path).unwrap();
    f.set_len(blocks(300)).unwrap();
    drop(f);

    let dev = FileDevice::open(&path).unwrap();
    let sb = tinyfs::format(&dev).unwrap();
    assert_eq!(sb.nr_blocks, 300);

    let fs = FileSystem::mount(Arc::new(dev)).unwrap();
    let ino = fs.alloc_inode().unwrap();
    fs.unmount().unwrap();

    let fs = FileSystem::mount(Arc::new(FileDevice::open(&path).unwrap())).unwrap();
    assert!(!fs.with_inode_bitmap(|b| b.test(ino)).unwrap());
    assert_eq!(fs.statfs().files, 2);
    drop(fs);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn overlapping_syncs_reach_disk_in_order() {
    let (reached_tx, reached_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let dev = Arc::new(GatedDevice {
        inner: MemDevice::with_bytes(ONE_MIB),
        armed: AtomicBool::new(false),
        reached: Mutex::new(reached_tx),
        release: Mutex::new(release_rx),
    });
    tinyfs::format(&*dev).unwrap();
    let fs = FileSystem::mount(Arc::clone(&dev)).unwrap();

    assert_eq!(fs.alloc_inode().unwrap(), 1);
    dev.armed.store(true, Ordering::SeqCst);

    thread::scope(|s| {
        let first = s.spawn(|| fs.sync(true));
        // first sync has its snapshot and is parked on block 0
        reached_rx.recv().unwrap();

        assert_eq!(fs.alloc_inode().unwrap(), 2);
        let second = s.spawn(|| fs.sync(true));
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        first.join().unwrap().unwrap();
        second.join().unwrap().unwrap();
    });
    log!("after both syncs: dirty={}", fs.is_dirty());
    assert!(!fs.is_dirty());
    let sb = fs.superblock();
    drop(fs);

    let again = FileSystem::mount(dev).unwrap();
    assert_eq!(again.superblock(), sb);
    assert!(!again.with_inode_bitmap(|b| b.test(2)).unwrap());
    assert_eq!(again.alloc_inode().unwrap(), 3);
}

#[test]
fn multi_block_bitmaps_round_trip() {
    let path = std::env::temp_dir().join(format!("tinyfs-wide-{}.img", std::process::id()));
    let total = 2 * BITS_PER_BLOCK as u64 + 5;
    let f = std::fs::File::create(&path).unwrap();
    // sparse: only metadata blocks are ever written
    f.set_len(blocks(total)).unwrap();
    drop(f);

    let sb = tinyfs::format(&FileDevice::open(&path).unwrap()).unwrap();
    log!("wide image: {:?}", sb);
    assert_eq!(sb.nr_blocks as u64, total);
    assert_eq!(sb.nr_ifree_blocks, 3);
    assert_eq!(sb.nr_bfree_blocks, 3);

    let fs = FileSystem::mount(Arc::new(FileDevice::open(&path).unwrap())).unwrap();
    let g = fs.geometry();
    assert_eq!(fs.superblock(), sb);
    assert_eq!(fs.with_inode_bitmap(|b| b.count_free()), sb.nr_free_inodes);
    assert_eq!(fs.with_block_bitmap(|b| b.count_free()), sb.nr_free_blocks);
    assert_eq!(fs.with_inode_bitmap(|b| b.find_first_free()).unwrap(), 1);
    assert_eq!(
        fs.with_block_bitmap(|b| b.find_first_free()).unwrap(),
        g.data_start() + 1
    );

    // walk the allocator into the second bitmap block
    let edge = BITS_PER_BLOCK as u32;
    let mut last = 0;
    while last < edge {
        last = fs.alloc_block().unwrap();
    }
    assert_eq!(last, edge);
    fs.free_block(g.data_start() + 1).unwrap();
    fs.sync(true).unwrap();
    let synced = fs.superblock();
    fs.unmount().unwrap();

    let fs = FileSystem::mount(Arc::new(FileDevice::open(&path).unwrap())).unwrap();
    assert_eq!(fs.superblock(), synced);
    assert!(!fs.with_block_bitmap(|b| b.test(edge)).unwrap());
    assert!(fs.with_block_bitmap(|b| b.test(edge + 1)).unwrap());
    assert_eq!(
        fs.with_block_bitmap(|b| b.count_free()),
        synced.nr_free_blocks
    );
    assert_eq!(fs.alloc_block().unwrap(), g.data_start() + 1);
    drop(fs);

    std::fs::remove_file(&path).unwrap();
}
