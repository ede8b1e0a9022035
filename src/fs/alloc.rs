//! The free-block allocator. It keeps no structure of its own: free
//! block numbers are stored inside free blocks, as a linked list of
//! bucket blocks rooted at the superblock's `free_list_root`.
//!
//! Within a bucket of `K = block_size / 4` slots, slot 0 holds the next
//! bucket's block number (0 if none) and slots 1..K-1 hold further free
//! block numbers. `free_list_index` counts how many of the root bucket's
//! payload slots are populated; when it reaches 0 the root bucket itself
//! is the next block handed out. Discipline is a stack: the most
//! recently released block is allocated first, and every non-root bucket
//! is full, which is what lets `allocate` assume `K - 1` populated slots
//! after consuming a root. The whole structure is recoverable from
//! `free_list_root` alone.

use tracing::trace;

use crate::device::DiskImage;
use crate::{FsError, Result};

fn slots_per_block(disk: &DiskImage) -> u32 {
    disk.block_size() as u32 / 4
}

/// Reads the block number stored at `slot` of a bucket and clears the
/// slot, so consumed entries never linger in blocks about to be handed
/// out as payload.
fn take_slot(disk: &mut DiskImage, bucket: u32, slot: u32) -> Result<u32> {
    let mut block = disk.read_block(bucket)?;
    let value = block.get_u32(4 * slot as usize);
    block.put_u32(4 * slot as usize, 0);
    disk.write_block(bucket, &block)?;
    Ok(value)
}

fn put_slot(disk: &mut DiskImage, bucket: u32, slot: u32, value: u32) -> Result<()> {
    let mut block = disk.read_block(bucket)?;
    block.put_u32(4 * slot as usize, value);
    disk.write_block(bucket, &block)
}

/// Hands out a free block number, or `DiskFull` when the structure is
/// empty.
pub fn allocate(disk: &mut DiskImage) -> Result<u32> {
    let root = disk.free_list_root()?;
    if root == 0 {
        return Err(FsError::DiskFull);
    }
    let index = disk.free_list_index()?;
    let block = if index != 0 {
        let block = take_slot(disk, root, index)?;
        disk.set_free_list_index(index - 1)?;
        block
    } else {
        // The root bucket's slots are spent; the bucket block itself is
        // the allocation. Its slot 0 names the next bucket, which is
        // always fully populated.
        let next = take_slot(disk, root, 0)?;
        disk.set_free_list_root(next)?;
        disk.set_free_list_index(slots_per_block(disk) - 1)?;
        root
    };
    trace!(block, "allocated block");
    Ok(block)
}

/// Returns a block to the free structure.
pub fn release(disk: &mut DiskImage, block: u32) -> Result<()> {
    let root = disk.free_list_root()?;
    let index = disk.free_list_index()?;
    if root == 0 {
        // Empty structure: the released block becomes the root bucket
        // with no successor and no payload slots yet.
        put_slot(disk, block, 0, 0)?;
        disk.set_free_list_root(block)?;
        disk.set_free_list_index(0)?;
    } else if index == slots_per_block(disk) - 1 {
        // Root bucket is full: the released block becomes a new root
        // chained in front of it.
        put_slot(disk, block, 0, root)?;
        disk.set_free_list_root(block)?;
        disk.set_free_list_index(0)?;
    } else {
        disk.set_free_list_index(index + 1)?;
        put_slot(disk, root, index + 1, block)?;
    }
    trace!(block, "released block");
    Ok(())
}

/// Format-time batch registration: every data block after the root
/// directory's pre-assigned block enters the free structure, in
/// ascending order.
pub fn initialize(disk: &mut DiskImage) -> Result<()> {
    for block in disk.data_start() + 1..disk.capacity() {
        release(disk, block)?;
    }
    Ok(())
}
