//! Block 0 of every image. Holds the device geometry, fixed at format
//! time, and the two free-list cursor fields, which mutate on every
//! allocation and release.

use packed_struct::prelude::*;

use crate::device::VirtualBlock;
use crate::{FsError, Result};

/// On-disk layout (little-endian u32s, back to back):
/// `block_size`, `capacity`, `inode_count`, `free_list_root`,
/// `free_list_index`, `data_start`.
///
/// `free_list_root == 0` means the free structure is empty.
/// `data_start` is the first block after the inode table; it doubles as
/// the root directory's first data block.
#[derive(PackedStruct, Debug, Clone, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct Superblock {
    pub block_size: u32,
    pub capacity: u32,
    pub inode_count: u32,
    pub free_list_root: u32,
    pub free_list_index: u32,
    pub data_start: u32,
}

/// Bytes per packed inode record: `size_bytes` u32 + `first_data_block` u32.
pub const INODE_RECORD_SIZE: u32 = 8;

impl Superblock {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Derives the format-time geometry for a fresh image. One inode
    /// record per KiB of device, floor of 8; the inode table starts at
    /// block 1 and data blocks follow it.
    pub fn for_geometry(capacity: u32, block_size: u32) -> Result<Self> {
        if !capacity.is_power_of_two() || !block_size.is_power_of_two() || block_size < 32 {
            return Err(FsError::InvalidGeometry);
        }
        let total_bytes = capacity as u64 * block_size as u64;
        let inode_count = (total_bytes / 1024).max(8) as u32;
        let table_bytes = inode_count * INODE_RECORD_SIZE;
        let table_blocks = table_bytes.div_ceil(block_size);
        let data_start = 1 + table_blocks;
        // superblock + inode table + root directory + at least one data block
        if data_start + 1 >= capacity {
            return Err(FsError::InvalidGeometry);
        }
        Ok(Self {
            block_size,
            capacity,
            inode_count,
            free_list_root: 0,
            free_list_index: 0,
            data_start,
        })
    }

    pub fn read_from(block: &VirtualBlock) -> Result<Self> {
        Self::unpack_from_slice(&block.as_slice()[..Self::SIZE])
            .map_err(|_| FsError::Corruption("superblock does not unpack"))
    }

    pub fn write_to(&self, block: &mut VirtualBlock) {
        // infallible for a fixed-width struct
        let bytes = self.pack().unwrap();
        block.write_bytes(0, &bytes);
    }

    /// Number of blocks occupied by the inode table.
    pub fn inode_table_blocks(&self) -> u32 {
        self.data_start - 1
    }
}
