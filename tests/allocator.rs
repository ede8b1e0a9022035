//! Free-block allocator properties: stack discipline, bucket handling,
//! and accounting against the device geometry.

mod common;

use common::TempImage;
use platter::fs::alloc;
use platter::{DiskImage, FileSystem, FsError};

// blockSize 32 gives K = 8 slots per bucket; capacity 16 formats to a
// 2-block inode table, root directory at block 3, and 12 free blocks.
const CAPACITY: u32 = 16;
const BLOCK_SIZE: u32 = 32;
const K: u32 = BLOCK_SIZE / 4;

fn formatted(name: &str) -> (TempImage, DiskImage) {
    let image = TempImage::new(name);
    FileSystem::create(image.path(), CAPACITY, BLOCK_SIZE).unwrap();
    let disk = DiskImage::open(image.path()).unwrap();
    (image, disk)
}

fn drain(disk: &mut DiskImage) -> Vec<u32> {
    let mut blocks = Vec::new();
    loop {
        match alloc::allocate(disk) {
            Ok(block) => blocks.push(block),
            Err(FsError::DiskFull) => return blocks,
            Err(other) => panic!("unexpected allocator error: {other}"),
        }
    }
}

#[test]
fn format_registers_every_data_block() {
    let (_image, mut disk) = formatted("alloc-accounting");
    let expected = CAPACITY - disk.data_start() - 1;
    let mut blocks = drain(&mut disk);
    assert_eq!(blocks.len() as u32, expected);
    assert_eq!(disk.free_list_root().unwrap(), 0);
    blocks.sort_unstable();
    blocks.dedup();
    assert_eq!(blocks.len() as u32, expected, "allocator returned a duplicate");
    assert!(blocks
        .iter()
        .all(|&b| b > disk.data_start() && b < CAPACITY));
}

#[test]
fn allocation_is_stack_ordered() {
    let (_image, mut disk) = formatted("alloc-stack");
    let a = alloc::allocate(&mut disk).unwrap();
    let b = alloc::allocate(&mut disk).unwrap();
    alloc::release(&mut disk, a).unwrap();
    alloc::release(&mut disk, b).unwrap();
    assert_eq!(alloc::allocate(&mut disk).unwrap(), b);
    assert_eq!(alloc::allocate(&mut disk).unwrap(), a);
}

#[test]
fn bucket_fills_and_drains_back_to_empty() {
    let (_image, mut disk) = formatted("alloc-bucket");
    let released = drain(&mut disk);
    assert!(released.len() as u32 > K);
    assert_eq!(disk.free_list_root().unwrap(), 0);

    // K releases into an empty structure fill exactly one bucket: the
    // first released block is the root, the other K-1 sit in its slots.
    for &block in &released[..K as usize] {
        alloc::release(&mut disk, block).unwrap();
    }
    assert_eq!(disk.free_list_root().unwrap(), released[0]);
    assert_eq!(disk.free_list_index().unwrap(), K - 1);

    // The next release starts a new bucket in front of the full one.
    alloc::release(&mut disk, released[K as usize]).unwrap();
    assert_eq!(disk.free_list_root().unwrap(), released[K as usize]);
    assert_eq!(disk.free_list_index().unwrap(), 0);
}

#[test]
fn full_bucket_round_trips_through_allocate() {
    let (_image, mut disk) = formatted("alloc-roundtrip");
    let all = drain(&mut disk);
    let released = &all[..K as usize];
    for &block in released {
        alloc::release(&mut disk, block).unwrap();
    }
    let mut returned = Vec::new();
    for _ in 0..K {
        returned.push(alloc::allocate(&mut disk).unwrap());
    }
    let mut want = released.to_vec();
    want.sort_unstable();
    let mut got = returned.clone();
    got.sort_unstable();
    assert_eq!(got, want);
    // structure is empty again
    assert_eq!(disk.free_list_root().unwrap(), 0);
    assert!(matches!(alloc::allocate(&mut disk), Err(FsError::DiskFull)));
}

#[test]
fn cursor_state_survives_a_remount() {
    let image = TempImage::new("alloc-remount");
    FileSystem::create(image.path(), CAPACITY, BLOCK_SIZE).unwrap();
    let mut disk = DiskImage::open(image.path()).unwrap();
    alloc::allocate(&mut disk).unwrap();
    alloc::allocate(&mut disk).unwrap();
    let root = disk.free_list_root().unwrap();
    let index = disk.free_list_index().unwrap();
    disk.close().unwrap();

    let disk = DiskImage::open(image.path()).unwrap();
    assert_eq!(disk.free_list_root().unwrap(), root);
    assert_eq!(disk.free_list_index().unwrap(), index);
}
