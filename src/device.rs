//! The virtual block device: a fixed geometry of `capacity` blocks of
//! `block_size` bytes each, persisted as a single host file and mapped
//! into memory. Every higher layer touches persisted bytes only through
//! [`DiskImage::read_block`] and [`DiskImage::write_block`].

pub mod block;
pub mod superblock;

pub use block::VirtualBlock;
pub use superblock::Superblock;

use std::ffi::c_void;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::IntoRawFd;
use std::path::Path;

use tracing::{debug, trace};

use crate::{FsError, Result};

/// An attached disk image. Geometry fields are cached at open time (they
/// are immutable for the life of the device); the free-list cursor
/// fields live in block 0 and every mutation is persisted immediately,
/// so a crash after any single mutator call leaves the superblock
/// consistent with that change.
#[derive(Debug)]
pub struct DiskImage {
    block_size: usize,
    capacity: u32,
    inode_count: u32,
    data_start: u32,
    data_addr: *mut u8,
    data_size: usize,
}

impl DiskImage {
    fn stat_file_size(fd: libc::c_int) -> Result<usize> {
        let mut stat = MaybeUninit::<libc::stat>::uninit();
        if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        let stat = unsafe { stat.assume_init() };
        trace!("stat'ed image size: {}", stat.st_size);
        Ok(stat.st_size as usize)
    }

    fn mmap_image(fd: libc::c_int, size: usize) -> Result<*mut u8> {
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error().into());
        }
        Ok(addr as *mut u8)
    }

    /// Creates a fresh, zero-filled image with a valid superblock. The
    /// inode table and free structure are still blank afterwards; the
    /// filesystem layer finishes formatting.
    pub fn create(path: impl AsRef<Path>, capacity: u32, block_size: u32) -> Result<()> {
        let path = path.as_ref();
        debug!("creating disk image at {path:?}");
        let superblock = Superblock::for_geometry(capacity, block_size)?;
        if path.exists() {
            return Err(FsError::AlreadyExists);
        }
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)?;
        let zeroes = vec![0u8; block_size as usize];
        let mut first = VirtualBlock::new(block_size as usize);
        superblock.write_to(&mut first);
        file.write_all(first.as_slice())?;
        for _ in 1..capacity {
            file.write_all(&zeroes)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Attaches to an existing image. The superblock must agree with the
    /// file's actual length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FsError::NotFound);
        }
        debug!("opening disk image at {path:?}");
        let mut file = File::options().read(true).write(true).open(path)?;
        let mut buf = [0; Superblock::SIZE];
        file.read_exact(&mut buf)
            .map_err(|_| FsError::Corruption("image too short for a superblock"))?;
        let superblock = Superblock::read_from(&VirtualBlock::from_slice(&buf))?;
        if !superblock.capacity.is_power_of_two()
            || !superblock.block_size.is_power_of_two()
            || superblock.block_size < 32
        {
            return Err(FsError::Corruption("superblock geometry is invalid"));
        }
        let fd = file.into_raw_fd();
        let size = Self::stat_file_size(fd)?;
        let expected = superblock.capacity as usize * superblock.block_size as usize;
        if size != expected {
            return Err(FsError::Corruption("image length disagrees with geometry"));
        }
        let addr = Self::mmap_image(fd, size)?;
        unsafe { libc::close(fd) };
        Ok(Self {
            block_size: superblock.block_size as usize,
            capacity: superblock.capacity,
            inode_count: superblock.inode_count,
            data_start: superblock.data_start,
            data_addr: addr,
            data_size: size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn inode_count(&self) -> u32 {
        self.inode_count
    }

    /// First block after the inode table; also the root directory's
    /// first data block.
    pub fn data_start(&self) -> u32 {
        self.data_start
    }

    fn block_offset(&self, block: u32) -> Result<usize> {
        if block >= self.capacity {
            return Err(FsError::OutOfRange {
                block,
                capacity: self.capacity,
            });
        }
        Ok(block as usize * self.block_size)
    }

    pub fn read_block(&self, block: u32) -> Result<VirtualBlock> {
        let offset = self.block_offset(block)?;
        let addr = self.data_addr.wrapping_add(offset);
        let data = unsafe { std::slice::from_raw_parts(addr, self.block_size) };
        Ok(VirtualBlock::from_slice(data))
    }

    pub fn write_block(&mut self, block: u32, contents: &VirtualBlock) -> Result<()> {
        if contents.len() != self.block_size {
            return Err(FsError::SizeMismatch {
                expected: self.block_size,
                actual: contents.len(),
            });
        }
        let offset = self.block_offset(block)?;
        let addr = self.data_addr.wrapping_add(offset);
        let data = unsafe { std::slice::from_raw_parts_mut(addr, self.block_size) };
        data.copy_from_slice(contents.as_slice());
        Ok(())
    }

    pub fn superblock(&self) -> Result<Superblock> {
        Superblock::read_from(&self.read_block(0)?)
    }

    fn update_superblock(&mut self, superblock: &Superblock) -> Result<()> {
        let mut block = self.read_block(0)?;
        superblock.write_to(&mut block);
        self.write_block(0, &block)
    }

    pub fn free_list_root(&self) -> Result<u32> {
        Ok(self.superblock()?.free_list_root)
    }

    pub fn set_free_list_root(&mut self, block: u32) -> Result<()> {
        let mut superblock = self.superblock()?;
        superblock.free_list_root = block;
        self.update_superblock(&superblock)
    }

    pub fn free_list_index(&self) -> Result<u32> {
        Ok(self.superblock()?.free_list_index)
    }

    pub fn set_free_list_index(&mut self, index: u32) -> Result<()> {
        let mut superblock = self.superblock()?;
        superblock.free_list_index = index;
        self.update_superblock(&superblock)
    }

    /// Flushes the mapping to the backing file and detaches. Dropping a
    /// `DiskImage` also unmaps, but without the explicit sync.
    pub fn close(self) -> Result<()> {
        let err = unsafe { libc::msync(self.data_addr as *mut c_void, self.data_size, libc::MS_SYNC) };
        if err != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }
}

impl Drop for DiskImage {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.data_addr as *mut c_void, self.data_size);
        }
    }
}
