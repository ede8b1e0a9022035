//! An emulated block device and a minimal inode-based file system on top
//! of it, backed by a single host file acting as the raw platter.
//!
//! Layering, bottom to top:
//! - [`device::VirtualBlock`]: one block's worth of bytes plus the
//!   fixed-width codec used for raw integer fields.
//! - [`device::DiskImage`]: the mmap-backed block device and its
//!   superblock.
//! - [`fs::alloc`]: the free-block allocator, stored inside the free
//!   blocks themselves.
//! - [`fs::inode`], [`fs::chain`], [`fs::dir`]: inode table, block
//!   chains, directory entries.
//! - [`fs::FileSystem`]: the mounted-image session exposing the
//!   file-level operations.

pub mod device;
pub mod fs;

use thiserror::Error;

pub use device::{DiskImage, Superblock, VirtualBlock};
pub use fs::FileSystem;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FsError {
    #[error("capacity and block size must be powers of two, block size at least 32")]
    InvalidGeometry,
    #[error("a disk image already exists at the target path")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("no free blocks left on the device")]
    DiskFull,
    #[error("no free inode records left")]
    NoFreeInodes,
    #[error("invalid inode index {0}")]
    InvalidInode(u32),
    #[error("file names must be 1 to 20 bytes long")]
    InvalidName,
    #[error("block number {block} out of range for capacity {capacity}")]
    OutOfRange { block: u32, capacity: u32 },
    #[error("buffer is {actual} bytes, block size is {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("on-disk structure is corrupt: {0}")]
    Corruption(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
