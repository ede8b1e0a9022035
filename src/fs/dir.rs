//! Directory entries. A directory's content chain packs 24-byte
//! records, 20 bytes of space-padded name followed by a 4-byte inode
//! index, front to back within each block's payload region. An inode
//! index of 0 marks the end of the used entries in that block.

use std::fmt;

use packed_struct::prelude::*;

use crate::device::{DiskImage, VirtualBlock};
use crate::fs::{alloc, chain};
use crate::{FsError, Result};

pub const NAME_LEN: usize = 20;
pub const ENTRY_SIZE: usize = 24;

#[derive(PackedStruct, Debug, Clone, Copy)]
#[packed_struct(endian = "lsb")]
pub struct DirEntry {
    pub name: [u8; 20],
    pub inode: u32,
}

/// A filename at its fixed on-disk width: exactly 20 bytes, shorter
/// names space-padded. Comparison is over the full 20 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryName([u8; NAME_LEN]);

impl EntryName {
    pub fn new(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > NAME_LEN {
            return Err(FsError::InvalidName);
        }
        let mut fixed = [b' '; NAME_LEN];
        fixed[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(fixed))
    }

    pub fn from_bytes(bytes: [u8; NAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trimmed = String::from_utf8_lossy(&self.0);
        f.write_str(trimmed.trim_end_matches([' ', '\0']))
    }
}

/// Where an entry sits: the owning block and the byte offset of the
/// record inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySlot {
    pub block: u32,
    pub offset: usize,
}

fn entries_per_block(disk: &DiskImage) -> usize {
    (disk.block_size() - 4) / ENTRY_SIZE
}

fn entry_at(contents: &VirtualBlock, offset: usize) -> Result<DirEntry> {
    DirEntry::unpack_from_slice(&contents.as_slice()[offset..offset + ENTRY_SIZE])
        .map_err(|_| FsError::Corruption("directory entry does not unpack"))
}

/// Walks the directory chain looking for an exact 20-byte name match.
/// Within each block, an inode index of 0 ends that block's used
/// entries and the scan moves to the next block.
pub fn find_entry(
    disk: &DiskImage,
    dir_first: u32,
    name: &EntryName,
) -> Result<Option<(EntrySlot, u32)>> {
    let per_block = entries_per_block(disk);
    for block in chain::blocks(disk, dir_first)? {
        let contents = disk.read_block(block)?;
        for i in 0..per_block {
            let offset = i * ENTRY_SIZE;
            let entry = entry_at(&contents, offset)?;
            if entry.inode == 0 {
                break;
            }
            if entry.name == *name.as_bytes() {
                return Ok(Some((EntrySlot { block, offset }, entry.inode)));
            }
        }
    }
    Ok(None)
}

/// Finds the first unused slot anywhere in the directory chain. If the
/// chain is saturated, appends a freshly zeroed block and hands out its
/// slot 0.
pub fn allocate_slot(disk: &mut DiskImage, dir_first: u32) -> Result<EntrySlot> {
    let per_block = entries_per_block(disk);
    let all = chain::blocks(disk, dir_first)?;
    for &block in &all {
        let contents = disk.read_block(block)?;
        for i in 0..per_block {
            let offset = i * ENTRY_SIZE;
            if entry_at(&contents, offset)?.inode == 0 {
                return Ok(EntrySlot { block, offset });
            }
        }
    }
    let fresh = alloc::allocate(disk)?;
    disk.write_block(fresh, &VirtualBlock::new(disk.block_size()))?;
    let last = all[all.len() - 1];
    let mut tail = disk.read_block(last)?;
    tail.set_next_block(fresh);
    disk.write_block(last, &tail)?;
    Ok(EntrySlot {
        block: fresh,
        offset: 0,
    })
}

/// Binds `name` to `inode` in the first available slot of the
/// directory.
pub fn write_entry(disk: &mut DiskImage, dir_first: u32, name: &EntryName, inode: u32) -> Result<()> {
    let slot = allocate_slot(disk, dir_first)?;
    let mut contents = disk.read_block(slot.block)?;
    let entry = DirEntry {
        name: *name.as_bytes(),
        inode,
    };
    contents.write_bytes(slot.offset, &entry.pack().unwrap());
    disk.write_block(slot.block, &contents)
}

/// Every populated entry in the directory, in chain-then-slot order.
pub fn list_entries(disk: &DiskImage, dir_first: u32) -> Result<Vec<(EntryName, u32)>> {
    let per_block = entries_per_block(disk);
    let mut entries = Vec::new();
    for block in chain::blocks(disk, dir_first)? {
        let contents = disk.read_block(block)?;
        for i in 0..per_block {
            let entry = entry_at(&contents, i * ENTRY_SIZE)?;
            if entry.inode == 0 {
                break;
            }
            entries.push((EntryName::from_bytes(entry.name), entry.inode));
        }
    }
    Ok(entries)
}
