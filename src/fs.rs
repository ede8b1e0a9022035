//! The filesystem proper: formatting, mount sessions, and the
//! file-level operations composed from the allocator, inode table, and
//! chain/directory layers.

pub mod alloc;
pub mod chain;
pub mod dir;
pub mod inode;

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::device::DiskImage;
use crate::fs::dir::EntryName;
use crate::fs::inode::{InodeRecord, ROOT_INODE};
use crate::{FsError, Result};

/// A mounted disk image. The session value *is* the mount: every
/// operation threads through it, there is no ambient current-device
/// state, and at most one session should be held per image at a time.
/// Dropping or [`FileSystem::unmount`]ing detaches.
#[derive(Debug)]
pub struct FileSystem {
    disk: DiskImage,
}

impl FileSystem {
    /// Formats a new device: creates the image, binds inode 0 to the
    /// root directory's first data block, and registers every remaining
    /// block with the free-block allocator.
    pub fn create(path: impl AsRef<Path>, capacity: u32, block_size: u32) -> Result<()> {
        let path = path.as_ref();
        DiskImage::create(path, capacity, block_size)?;
        let mut disk = DiskImage::open(path)?;
        let data_start = disk.data_start();
        inode::write_record(
            &mut disk,
            ROOT_INODE,
            &InodeRecord {
                size_bytes: 0,
                first_data_block: data_start,
            },
        )?;
        alloc::initialize(&mut disk)?;
        debug!("formatted device at {path:?}");
        disk.close()
    }

    /// Removes a device image from the host filesystem.
    pub fn delete(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FsError::NotFound);
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Attaches to an existing device image.
    pub fn mount(path: impl AsRef<Path>) -> Result<Self> {
        let disk = DiskImage::open(path)?;
        Ok(Self { disk })
    }

    /// Detaches, flushing the mapping to the backing file.
    pub fn unmount(self) -> Result<()> {
        self.disk.close()
    }

    /// The underlying device, for layer-level access.
    pub fn disk(&mut self) -> &mut DiskImage {
        &mut self.disk
    }

    fn root_block(&self) -> Result<u32> {
        inode::first_data_block(&self.disk, ROOT_INODE)
    }

    /// Creates `name` with `bytes` as its content, or replaces the
    /// content if the name already exists. A replaced file keeps its
    /// directory slot, inode, and first data block; the rest of its old
    /// chain returns to the free structure.
    pub fn load_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let name = EntryName::new(name)?;
        let root = self.root_block()?;
        match dir::find_entry(&self.disk, root, &name)? {
            Some((_, index)) => {
                let first = inode::first_data_block(&self.disk, index)?;
                chain::clear(&mut self.disk, first)?;
                chain::write_content(&mut self.disk, first, bytes)?;
                inode::set_size(&mut self.disk, index, bytes.len() as u32)?;
            }
            None => {
                let index = inode::allocate(&self.disk)?;
                let first = alloc::allocate(&mut self.disk)?;
                dir::write_entry(&mut self.disk, root, &name, index)?;
                inode::set_first_data_block(&mut self.disk, index, first)?;
                chain::write_content(&mut self.disk, first, bytes)?;
                inode::set_size(&mut self.disk, index, bytes.len() as u32)?;
            }
        }
        debug!(name = %name, bytes = bytes.len(), "loaded file");
        Ok(())
    }

    /// Copies an existing internal file's content to another name,
    /// creating or replacing the destination.
    pub fn copy_file(&mut self, src: &str, dst: &str) -> Result<()> {
        let content = self.read_file(src)?;
        self.load_file(dst, &content)
    }

    /// Every file in the root directory, paired with its size in bytes.
    pub fn list(&self) -> Result<Vec<(String, u32)>> {
        let root = self.root_block()?;
        let mut out = Vec::new();
        for (name, index) in dir::list_entries(&self.disk, root)? {
            out.push((name.to_string(), inode::size(&self.disk, index)?));
        }
        Ok(out)
    }

    /// The full content of a named file, bounded by its inode's
    /// recorded size.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let name = EntryName::new(name)?;
        let root = self.root_block()?;
        let (_, index) = dir::find_entry(&self.disk, root, &name)?.ok_or(FsError::NotFound)?;
        let size = inode::size(&self.disk, index)?;
        let first = inode::first_data_block(&self.disk, index)?;
        chain::read_content(&self.disk, first, size)
    }
}
