//! Common utilities for tests
#![allow(dead_code)]

use std::sync::Arc;

use tinyfs::{BLOCK_SIZE, FileSystem, MemDevice, Superblock};

pub const ONE_MIB: u64 = 1_048_576;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// e.g. log!("placeholder {}", 1) -> println!("[test] placeholder 1");
#[macro_export]
macro_rules! log {
    ($msg:expr $(, $arg:expr)* $(,)?) => {
        println!("{}[test] {}{}", $crate::common::ORANGE, format!($msg $(, $arg)*), $crate::common::RESET)
    };
}

pub fn blocks(n: u64) -> u64 {
    n * BLOCK_SIZE as u64
}

/// A freshly formatted RAM disk of `bytes` bytes.
pub fn formatted(bytes: u64) -> (Arc<MemDevice>, Superblock) {
    let dev = Arc::new(MemDevice::with_bytes(bytes));
    let sb = tinyfs::format(&*dev).unwrap();
    (dev, sb)
}

pub fn mounted(bytes: u64) -> (Arc<MemDevice>, FileSystem<MemDevice>) {
    let (dev, _) = formatted(bytes);
    let fs = FileSystem::mount(Arc::clone(&dev)).unwrap();
    (dev, fs)
}

/// Number of zero (used) bits among the first `len` bits of `bytes`.
pub fn used_bits(bytes: &[u8], len: u32) -> u32 {
    (0..len)
        .filter(|&i| bytes[i as usize / 8] & (1 << (i % 8)) == 0)
        .count() as u32
}
