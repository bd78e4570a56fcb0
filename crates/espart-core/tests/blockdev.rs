//! Block device engine tests driven against the `espart-dummy`
//! emulator. These live as integration tests so that `RamFlash`
//! implements the same `FlashMedium` trait instance the tests link
//! against (a dev-dependency cycle gives unit tests a second copy of
//! the crate with incompatible trait identities).

use std::sync::Arc;

use espart_core::blockdev::{IoctlOp, PartitionHandle};
use espart_core::error::{Error, Fault};
use espart_core::medium::{ERASED_BYTE, NATIVE_BLOCK_SIZE};
use espart_core::partition::{subtype, Label, Partition, PartitionFlags, PartitionType};
use espart_dummy::RamFlash;

const PAGE: u32 = NATIVE_BLOCK_SIZE;

fn test_partition(address: u32, size: u32) -> Arc<Partition> {
    Arc::new(Partition::new(
        PartitionType::Data,
        subtype::DATA_FAT,
        address,
        size,
        Label::try_from("vfs").unwrap(),
        PartitionFlags::empty(),
    ))
}

fn handle(block_size: u32) -> (RamFlash, PartitionHandle) {
    // Partition in the middle of the medium so bounds mistakes
    // would clobber neighbors, not fall off the end.
    let medium = RamFlash::new(16 * PAGE);
    let handle = PartitionHandle::new(test_partition(4 * PAGE, 8 * PAGE), block_size).unwrap();
    (medium, handle)
}

#[test]
fn native_block_round_trip() {
    let (mut medium, mut h) = handle(PAGE);
    let data = vec![0xA5u8; PAGE as usize];
    h.write_blocks(&mut medium, 2, &data, None).unwrap();

    let mut buf = vec![0u8; PAGE as usize];
    h.read_blocks(&mut medium, 2, &mut buf, None).unwrap();
    assert_eq!(buf, data);
}

#[test]
fn native_write_erases_exact_range() {
    let (mut medium, mut h) = handle(PAGE);
    let data = vec![0x11u8; 2 * PAGE as usize];
    h.write_blocks(&mut medium, 1, &data, None).unwrap();
    assert_eq!(medium.erases(), vec![(4 * PAGE + PAGE, 2 * PAGE)]);
}

#[test]
fn simple_write_rejects_partial_block() {
    let (mut medium, mut h) = handle(PAGE);
    let res = h.write_blocks(&mut medium, 0, &[0u8; 100], None);
    assert_eq!(res.err(), Some(Error::InvalidArgument));
}

#[test]
fn small_block_write_preserves_page_neighbors() {
    let (mut medium, mut h) = handle(512);

    // Pattern A into block 0, pattern B into block 1; both share
    // the first native page.
    let a = vec![0xAAu8; 512];
    let b = vec![0xBBu8; 512];
    h.write_blocks(&mut medium, 0, &a, None).unwrap();
    h.write_blocks(&mut medium, 1, &b, None).unwrap();

    let mut buf = vec![0u8; 512];
    h.read_blocks(&mut medium, 0, &mut buf, None).unwrap();
    assert_eq!(buf, a, "block 0 corrupted by block 1's write");
    h.read_blocks(&mut medium, 1, &mut buf, None).unwrap();
    assert_eq!(buf, b);

    // The rest of the native page is still erased.
    let mut rest = vec![0u8; (PAGE - 1024) as usize];
    h.read_blocks(&mut medium, 2, &mut rest, None).unwrap();
    assert!(rest.iter().all(|&byte| byte == ERASED_BYTE));
}

#[test]
fn small_block_round_trip_all_indices() {
    let (mut medium, mut h) = handle(512);
    for block in 0..h.block_count().min(16) {
        let data = vec![block as u8; 512];
        h.write_blocks(&mut medium, block, &data, None).unwrap();
    }
    for block in 0..h.block_count().min(16) {
        let mut buf = vec![0u8; 512];
        h.read_blocks(&mut medium, block, &mut buf, None).unwrap();
        assert_eq!(buf, vec![block as u8; 512]);
    }
}

#[test]
fn multi_page_write_captures_only_first_and_last_page() {
    // 64-byte blocks, far below the native page size. A write
    // spanning three native pages must only read back the first
    // and last page; middle pages are erased without capture.
    let (mut medium, mut h) = handle(64);

    // Surround the span with live data so corruption would show.
    let guard = vec![0x5Au8; 64];
    h.write_blocks(&mut medium, 0, &guard, None).unwrap();
    // Block 138 = partition offset 8832, inside the third native
    // page but past the end of the span written below.
    let tail_block = 138;
    h.write_blocks(&mut medium, tail_block, &guard, None).unwrap();
    medium.clear_log();

    // Blocks 1.. covering a bit more than two native pages.
    let len = (2 * PAGE + 512) as usize;
    let data = vec![0xC3u8; len];
    h.write_blocks(&mut medium, 1, &data, None).unwrap();

    let pages_read: Vec<u32> = medium.reads().iter().map(|&(addr, _)| addr).collect();
    // Write region is [64, 64 + len) within the partition: head on
    // page 0, tail on page 2.
    assert_eq!(pages_read, vec![4 * PAGE, 4 * PAGE + 2 * PAGE]);
    assert_eq!(
        medium.erases(),
        vec![
            (4 * PAGE, PAGE),
            (4 * PAGE + PAGE, PAGE),
            (4 * PAGE + 2 * PAGE, PAGE),
        ]
    );

    // Payload and both guards intact.
    let mut buf = vec![0u8; len];
    h.read_blocks(&mut medium, 1, &mut buf, None).unwrap();
    assert_eq!(buf, data);
    let mut g = vec![0u8; 64];
    h.read_blocks(&mut medium, 0, &mut g, None).unwrap();
    assert_eq!(g, guard);
    h.read_blocks(&mut medium, tail_block, &mut g, None).unwrap();
    assert_eq!(g, guard);
}

#[test]
fn extended_write_appends_without_erase() {
    let (mut medium, mut h) = handle(PAGE);

    // Simple write of half a block's worth of real data, padded
    // with erased bytes, then append into the rest via sub-offset.
    let mut first = vec![ERASED_BYTE; PAGE as usize];
    first[..2048].fill(0x11);
    h.write_blocks(&mut medium, 3, &first, None).unwrap();
    medium.clear_log();

    let tail = vec![0x22u8; 2048];
    h.write_blocks(&mut medium, 3, &tail, Some(2048)).unwrap();
    assert!(medium.erases().is_empty(), "extended write must not erase");

    let mut buf = vec![0u8; PAGE as usize];
    h.read_blocks(&mut medium, 3, &mut buf, None).unwrap();
    assert!(buf[..2048].iter().all(|&b| b == 0x11));
    assert!(buf[2048..].iter().all(|&b| b == 0x22));
}

#[test]
fn read_with_sub_offset() {
    let (mut medium, mut h) = handle(PAGE);
    let mut data = vec![0u8; PAGE as usize];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = i as u8;
    }
    h.write_blocks(&mut medium, 0, &data, None).unwrap();

    let mut buf = [0u8; 16];
    h.read_blocks(&mut medium, 0, &mut buf, Some(100)).unwrap();
    assert_eq!(&buf[..], &data[100..116]);
}

#[test]
fn out_of_bounds_is_an_io_fault() {
    let (mut medium, mut h) = handle(PAGE);
    let count = h.block_count();

    let mut buf = [0u8; 1];
    let res = h.read_blocks(&mut medium, count, &mut buf, None);
    assert!(matches!(res, Err(Error::Io(Fault::OutOfRange { .. }))));

    let data = vec![0u8; PAGE as usize];
    let res = h.write_blocks(&mut medium, count, &data, None);
    assert!(matches!(res, Err(Error::Io(Fault::OutOfRange { .. }))));

    // Sub-offset pushing past the end of the partition.
    let res = h.read_blocks(&mut medium, count - 1, &mut [0u8; 8], Some(PAGE - 4));
    assert!(matches!(res, Err(Error::Io(Fault::OutOfRange { .. }))));
}

#[test]
fn ioctl_queries() {
    let (mut medium, mut h) = handle(512);
    assert_eq!(h.ioctl(&mut medium, IoctlOp::Init, 0).unwrap(), Some(0));
    assert_eq!(h.ioctl(&mut medium, IoctlOp::Deinit, 0).unwrap(), Some(0));
    assert_eq!(h.ioctl(&mut medium, IoctlOp::Sync, 0).unwrap(), Some(0));
    assert_eq!(
        h.ioctl(&mut medium, IoctlOp::BlockCount, 0).unwrap(),
        Some(8 * PAGE / 512)
    );
    assert_eq!(
        h.ioctl(&mut medium, IoctlOp::BlockSize, 0).unwrap(),
        Some(512)
    );
}

#[test]
fn ioctl_block_erase_requires_native_block_size() {
    let (mut medium, mut h) = handle(512);
    let res = h.ioctl(&mut medium, IoctlOp::BlockErase, 0);
    assert_eq!(res.err(), Some(Error::InvalidArgument));

    let (mut medium, mut h) = handle(PAGE);
    assert_eq!(
        h.ioctl(&mut medium, IoctlOp::BlockErase, 2).unwrap(),
        Some(0)
    );
    assert_eq!(medium.erases(), vec![(4 * PAGE + 2 * PAGE, PAGE)]);

    // Erasing past the end of the partition is rejected.
    let res = h.ioctl(&mut medium, IoctlOp::BlockErase, 8);
    assert!(matches!(res, Err(Error::Io(Fault::OutOfRange { .. }))));
}

#[test]
fn fault_mid_protocol_is_surfaced_uncorrected() {
    let (mut medium, mut h) = handle(512);
    let data = vec![0x77u8; 512];
    h.write_blocks(&mut medium, 0, &data, None).unwrap();

    // Fault the erase after the head capture; no retry, no rollback.
    medium.fail_erase_at(4 * PAGE);
    let res = h.write_blocks(&mut medium, 1, &data, None);
    assert_eq!(
        res.err(),
        Some(Error::Io(Fault::Device(espart_dummy::STATUS_INJECTED)))
    );
}

#[test]
fn ioctl_unknown_op_is_ignored() {
    let (mut medium, mut h) = handle(512);
    assert_eq!(IoctlOp::from_raw(7), IoctlOp::Unknown(7));
    assert_eq!(
        h.ioctl(&mut medium, IoctlOp::from_raw(7), 123).unwrap(),
        None
    );
}
