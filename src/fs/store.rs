use crate::fs::device::BlockDevice;
use crate::fs::error::Result;
use crate::fs::filesystem::{FileSystem, StatFs};
use crate::fs::format;
use crate::fs::superblock::Superblock;
use std::sync::Arc;

/// What a host needs from the metadata engine, independent of how it
/// registers or dispatches filesystems.
pub trait MetadataStore: Sized {
    type Device: BlockDevice + ?Sized;

    fn format(device: &Self::Device) -> Result<Superblock>;

    fn mount(device: Arc<Self::Device>) -> Result<Self>;

    fn sync(&self, wait: bool) -> Result<()>;

    fn statfs(&self) -> StatFs;

    fn unmount(self) -> Result<()>;
}

impl<D: BlockDevice + ?Sized> MetadataStore for FileSystem<D> {
    type Device = D;

    fn format(device: &D) -> Result<Superblock> {
        format::format(device)
    }

    fn mount(device: Arc<D>) -> Result<Self> {
        FileSystem::mount(device)
    }

    fn sync(&self, wait: bool) -> Result<()> {
        FileSystem::sync(self, wait)
    }

    fn statfs(&self) -> StatFs {
        FileSystem::statfs(self)
    }

    fn unmount(self) -> Result<()> {
        FileSystem::unmount(self)
    }
}
