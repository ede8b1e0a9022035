//! Device lifecycle and block-level contracts: geometry validation,
//! range and size misuse, and persistence of raw blocks across
//! attach/detach cycles.

mod common;

use common::TempImage;
use platter::{DiskImage, FileSystem, FsError, VirtualBlock};

#[test]
fn geometry_validation() {
    let image = TempImage::new("dev-geometry");
    assert!(matches!(
        FileSystem::create(image.path(), 1024, 31),
        Err(FsError::InvalidGeometry)
    ));
    assert!(matches!(
        FileSystem::create(image.path(), 100, 64),
        Err(FsError::InvalidGeometry)
    ));
    FileSystem::create(image.path(), 1024, 64).unwrap();
}

#[test]
fn create_refuses_to_clobber() {
    let image = TempImage::new("dev-clobber");
    FileSystem::create(image.path(), 64, 32).unwrap();
    assert!(matches!(
        FileSystem::create(image.path(), 64, 32),
        Err(FsError::AlreadyExists)
    ));
}

#[test]
fn create_refuses_a_directory_in_the_way() {
    let image = TempImage::new("dev-dirpath");
    std::fs::create_dir(image.path()).unwrap();
    assert!(matches!(
        FileSystem::create(image.path(), 64, 32),
        Err(FsError::AlreadyExists)
    ));
    std::fs::remove_dir(image.path()).unwrap();
}

#[test]
fn missing_images_are_not_found() {
    let image = TempImage::new("dev-missing");
    assert!(matches!(
        DiskImage::open(image.path()),
        Err(FsError::NotFound)
    ));
    assert!(matches!(
        FileSystem::mount(image.path()),
        Err(FsError::NotFound)
    ));
    assert!(matches!(
        FileSystem::delete(image.path()),
        Err(FsError::NotFound)
    ));
}

#[test]
fn delete_removes_the_image() {
    let image = TempImage::new("dev-delete");
    FileSystem::create(image.path(), 64, 32).unwrap();
    FileSystem::delete(image.path()).unwrap();
    assert!(!image.path().exists());
}

#[test]
fn out_of_range_blocks_are_rejected() {
    let image = TempImage::new("dev-range");
    FileSystem::create(image.path(), 64, 32).unwrap();
    let mut disk = DiskImage::open(image.path()).unwrap();
    assert!(matches!(
        disk.read_block(64),
        Err(FsError::OutOfRange { block: 64, capacity: 64 })
    ));
    let block = VirtualBlock::new(32);
    assert!(matches!(
        disk.write_block(9000, &block),
        Err(FsError::OutOfRange { .. })
    ));
    disk.read_block(63).unwrap();
}

#[test]
fn wrong_sized_buffers_are_rejected() {
    let image = TempImage::new("dev-sizemismatch");
    FileSystem::create(image.path(), 64, 32).unwrap();
    let mut disk = DiskImage::open(image.path()).unwrap();
    let block = VirtualBlock::new(64);
    assert!(matches!(
        disk.write_block(5, &block),
        Err(FsError::SizeMismatch {
            expected: 32,
            actual: 64
        })
    ));
}

#[test]
fn blocks_persist_across_reattach() {
    let image = TempImage::new("dev-persist");
    FileSystem::create(image.path(), 64, 32).unwrap();
    let mut disk = DiskImage::open(image.path()).unwrap();
    let mut block = VirtualBlock::new(32);
    block.write_bytes(0, b"persisted payload");
    block.set_next_block(11);
    disk.write_block(40, &block).unwrap();
    disk.close().unwrap();

    let disk = DiskImage::open(image.path()).unwrap();
    let read = disk.read_block(40).unwrap();
    assert_eq!(read, block);
    assert_eq!(read.next_block(), 11);
}

#[test]
fn formatted_superblock_geometry() {
    let image = TempImage::new("dev-superblock");
    FileSystem::create(image.path(), 1024, 64).unwrap();
    let disk = DiskImage::open(image.path()).unwrap();
    assert_eq!(disk.block_size(), 64);
    assert_eq!(disk.capacity(), 1024);
    assert_eq!(disk.inode_count(), 64);
    assert_eq!(disk.data_start(), 9);
    // free structure populated at format time
    assert_ne!(disk.free_list_root().unwrap(), 0);
    let superblock = disk.superblock().unwrap();
    assert_eq!(superblock.capacity, 1024);
    assert_eq!(superblock.inode_table_blocks(), 8);
}

#[test]
fn truncated_images_are_corrupt() {
    let image = TempImage::new("dev-truncated");
    FileSystem::create(image.path(), 64, 32).unwrap();
    let bytes = std::fs::read(image.path()).unwrap();
    std::fs::write(image.path(), &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(
        DiskImage::open(image.path()),
        Err(FsError::Corruption(_))
    ));
}
