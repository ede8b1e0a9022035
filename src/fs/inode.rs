//! The inode table: fixed-width records packed back to back in the
//! blocks between the superblock and `data_start`, indexed from 0.
//! `first_data_block == 0` marks a record as free. Record 0 is reserved
//! for the root directory and is never allocated or freed here.

use packed_struct::prelude::*;

use crate::device::superblock::INODE_RECORD_SIZE;
use crate::device::DiskImage;
use crate::{FsError, Result};

/// The root directory's inode.
pub const ROOT_INODE: u32 = 0;

#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct InodeRecord {
    pub size_bytes: u32,
    pub first_data_block: u32,
}

/// Block number and in-block byte offset of an inode record.
fn locate(disk: &DiskImage, index: u32) -> Result<(u32, usize)> {
    if index >= disk.inode_count() {
        return Err(FsError::InvalidInode(index));
    }
    let per_block = disk.block_size() as u32 / INODE_RECORD_SIZE;
    let block = 1 + index / per_block;
    let offset = (index % per_block) * INODE_RECORD_SIZE;
    Ok((block, offset as usize))
}

pub fn read_record(disk: &DiskImage, index: u32) -> Result<InodeRecord> {
    let (block, offset) = locate(disk, index)?;
    let contents = disk.read_block(block)?;
    InodeRecord::unpack_from_slice(&contents.as_slice()[offset..offset + INODE_RECORD_SIZE as usize])
        .map_err(|_| FsError::Corruption("inode record does not unpack"))
}

pub fn write_record(disk: &mut DiskImage, index: u32, record: &InodeRecord) -> Result<()> {
    let (block, offset) = locate(disk, index)?;
    let mut contents = disk.read_block(block)?;
    contents.write_bytes(offset, &record.pack().unwrap());
    disk.write_block(block, &contents)
}

/// Finds the lowest free record in `[1, inode_count)`. The record is not
/// marked used until the caller binds its first data block.
pub fn allocate(disk: &DiskImage) -> Result<u32> {
    for index in 1..disk.inode_count() {
        if read_record(disk, index)?.first_data_block == 0 {
            return Ok(index);
        }
    }
    Err(FsError::NoFreeInodes)
}

/// Clears a record back to free. Index 0 is never freed.
pub fn free(disk: &mut DiskImage, index: u32) -> Result<()> {
    if index == ROOT_INODE {
        return Err(FsError::InvalidInode(index));
    }
    write_record(
        disk,
        index,
        &InodeRecord {
            size_bytes: 0,
            first_data_block: 0,
        },
    )
}

pub fn first_data_block(disk: &DiskImage, index: u32) -> Result<u32> {
    Ok(read_record(disk, index)?.first_data_block)
}

pub fn set_first_data_block(disk: &mut DiskImage, index: u32, block: u32) -> Result<()> {
    let mut record = read_record(disk, index)?;
    record.first_data_block = block;
    write_record(disk, index, &record)
}

pub fn size(disk: &DiskImage, index: u32) -> Result<u32> {
    Ok(read_record(disk, index)?.size_bytes)
}

pub fn set_size(disk: &mut DiskImage, index: u32, bytes: u32) -> Result<()> {
    let mut record = read_record(disk, index)?;
    record.size_bytes = bytes;
    write_record(disk, index, &record)
}
