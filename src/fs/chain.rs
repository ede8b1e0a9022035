//! Block chains: every file's and directory's content is a singly
//! linked sequence of blocks, each block's last 4 bytes naming its
//! successor (0 terminates). The first `block_size - 4` bytes of each
//! block are payload.

use tracing::trace;

use crate::device::{DiskImage, VirtualBlock};
use crate::fs::alloc;
use crate::{FsError, Result};

/// Every block number in the chain starting at `first`, in order. A
/// chain longer than the device has blocks means a successor pointer
/// cycles, which only allocator or chain-logic corruption can produce.
pub fn blocks(disk: &DiskImage, first: u32) -> Result<Vec<u32>> {
    let mut out = vec![first];
    let mut next = disk.read_block(first)?.next_block();
    while next != 0 {
        if out.len() >= disk.capacity() as usize {
            return Err(FsError::Corruption("block chain does not terminate"));
        }
        out.push(next);
        next = disk.read_block(next)?.next_block();
    }
    Ok(out)
}

/// Collects `size` payload bytes from the chain starting at `first`.
pub fn read_content(disk: &DiskImage, first: u32, size: u32) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size as usize);
    let mut remaining = size as usize;
    let mut block = first;
    loop {
        let contents = disk.read_block(block)?;
        let take = remaining.min(contents.payload_len());
        out.extend_from_slice(&contents.as_slice()[..take]);
        remaining -= take;
        if remaining == 0 {
            return Ok(out);
        }
        block = contents.next_block();
        if block == 0 {
            return Err(FsError::Corruption("chain ends before its recorded size"));
        }
    }
}

/// Writes `bytes` into the chain starting at the caller-supplied
/// `first` block, allocating one further block per additional payload's
/// worth of data and linking them through their trailing pointers. The
/// final block's pointer is zeroed. Empty content still occupies the
/// first block, with an empty payload.
///
/// Not atomic: if allocation fails partway, blocks already written stay
/// allocated and linked while the caller's metadata never comes to point
/// at them. That claimed-but-unreachable space is an accepted limitation
/// of the format, not recovered here.
pub fn write_content(disk: &mut DiskImage, first: u32, bytes: &[u8]) -> Result<()> {
    let payload = disk.block_size() - 4;
    let mut chunks: Vec<&[u8]> = bytes.chunks(payload).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let last = chunks.len() - 1;
    let mut block = first;
    for (i, chunk) in chunks.iter().enumerate() {
        let next = if i == last { 0 } else { alloc::allocate(disk)? };
        let mut contents = VirtualBlock::new(disk.block_size());
        contents.write_bytes(0, chunk);
        contents.set_next_block(next);
        disk.write_block(block, &contents)?;
        block = next;
    }
    trace!(first, blocks = chunks.len(), "wrote chain content");
    Ok(())
}

/// Zeroes every block of a chain and releases all of them except the
/// chain's own first block, which callers keep so directory entry and
/// inode can continue to point at a stable block across rewrites.
pub fn clear(disk: &mut DiskImage, first: u32) -> Result<()> {
    let all = blocks(disk, first)?;
    let empty = VirtualBlock::new(disk.block_size());
    for (i, &block) in all.iter().enumerate() {
        disk.write_block(block, &empty)?;
        if i != 0 {
            alloc::release(disk, block)?;
        }
    }
    trace!(first, blocks = all.len(), "cleared chain");
    Ok(())
}
