pub mod bitmap;
pub mod consts;
pub mod device;
pub mod error;
pub mod filesystem;
pub mod format;
pub mod geometry;
pub mod io;
pub mod layout;
pub mod store;
pub mod superblock;
