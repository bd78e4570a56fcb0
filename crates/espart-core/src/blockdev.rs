//! Block device engine
//!
//! Exposes a partition as a block device with a configurable logical
//! block size. The medium only erases whole native pages, so when the
//! logical block size is smaller than [`NATIVE_BLOCK_SIZE`] a simple
//! write runs a read-erase-modify-write protocol: live bytes sharing a
//! native page with the write region are captured into a scratch
//! buffer before the erase and replayed afterwards.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Fault, Result};
use crate::medium::{FlashMedium, NATIVE_BLOCK_SIZE};
use crate::partition::Partition;

/// Block device ioctl operations
///
/// A closed enumeration over the block-device contract's control
/// codes. Codes this engine does not know are kept as `Unknown` and
/// ignored rather than rejected, so that forward-compatible codes
/// from the host filesystem layer do not break mounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlOp {
    /// Initialize the device (no-op, the device needs no setup)
    Init,
    /// Deinitialize the device (no-op)
    Deinit,
    /// Flush pending writes (no-op, writes are synchronous)
    Sync,
    /// Query the number of logical blocks
    BlockCount,
    /// Query the logical block size in bytes
    BlockSize,
    /// Erase one logical block by index
    ///
    /// Only valid when the logical block size equals the native erase
    /// size; a partial-page erase cannot be expressed safely through
    /// this op.
    BlockErase,
    /// Unrecognized control code, carried verbatim
    Unknown(u32),
}

impl IoctlOp {
    /// Map a raw control code from the block-device contract
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Init,
            2 => Self::Deinit,
            3 => Self::Sync,
            4 => Self::BlockCount,
            5 => Self::BlockSize,
            6 => Self::BlockErase,
            other => Self::Unknown(other),
        }
    }
}

/// Handle to a partition with a chosen logical block size
///
/// Owns a shared reference to the descriptor and, when the block size
/// is smaller than the native erase size, a scratch buffer of exactly
/// one native page. The scratch buffer is allocated once at
/// construction and never reallocated; it is not safe for concurrent
/// use by two simultaneous operations on the same handle.
#[derive(Debug)]
pub struct PartitionHandle {
    part: Arc<Partition>,
    block_size: u32,
    scratch: Option<Vec<u8>>,
}

impl PartitionHandle {
    /// Create a handle with an explicit logical block size
    pub fn new(part: Arc<Partition>, block_size: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidArgument);
        }
        let scratch = if block_size < NATIVE_BLOCK_SIZE {
            Some(vec![0u8; NATIVE_BLOCK_SIZE as usize])
        } else {
            None
        };
        Ok(Self {
            part,
            block_size,
            scratch,
        })
    }

    /// Create a handle at the default block size (the native erase size)
    pub fn with_native_blocks(part: Arc<Partition>) -> Self {
        Self {
            part,
            block_size: NATIVE_BLOCK_SIZE,
            scratch: None,
        }
    }

    /// The partition this handle refers to
    pub fn partition(&self) -> &Arc<Partition> {
        &self.part
    }

    /// Logical block size in bytes
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of logical blocks (integer division; trailing bytes that
    /// do not fill a block are not addressable)
    pub fn block_count(&self) -> u32 {
        self.part.size() / self.block_size
    }

    /// Read bytes starting at a logical block, optionally at a
    /// sub-offset within it
    ///
    /// Reads `buf.len()` bytes from
    /// `block * block_size + sub_offset`. No erase is involved.
    pub fn read_blocks<M: FlashMedium + ?Sized>(
        &self,
        medium: &mut M,
        block: u32,
        buf: &mut [u8],
        sub_offset: Option<u32>,
    ) -> Result<()> {
        let offset = self.offset_of(block, sub_offset.unwrap_or(0), buf.len())?;
        medium.read(self.part.address() + offset, buf)
    }

    /// Write bytes starting at a logical block
    ///
    /// Without `sub_offset` this is a simple write: the engine erases
    /// the target region itself, and `data` must be a whole number of
    /// logical blocks. With `sub_offset` it is an extended write at
    /// `block * block_size + sub_offset` with no erase; the caller
    /// must have erased the destination beforehand (via a prior simple
    /// write or an explicit [`IoctlOp::BlockErase`]). Writing over
    /// non-erased cells is a medium-level fault and is not detected
    /// here.
    pub fn write_blocks<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        block: u32,
        data: &[u8],
        sub_offset: Option<u32>,
    ) -> Result<()> {
        match sub_offset {
            Some(sub) => {
                let offset = self.offset_of(block, sub, data.len())?;
                medium.write(self.part.address() + offset, data)
            }
            None => {
                if data.len() as u32 % self.block_size != 0 {
                    return Err(Error::InvalidArgument);
                }
                let offset = self.offset_of(block, 0, data.len())?;
                self.erase_then_write(medium, offset, data)
            }
        }
    }

    /// Control operation from the block-device contract
    ///
    /// Known ops return `Some(value)`; unknown ops are ignored and
    /// return `None` so newer contract codes stay tolerated.
    pub fn ioctl<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        op: IoctlOp,
        arg: u32,
    ) -> Result<Option<u32>> {
        match op {
            IoctlOp::Init | IoctlOp::Deinit | IoctlOp::Sync => Ok(Some(0)),
            IoctlOp::BlockCount => Ok(Some(self.block_count())),
            IoctlOp::BlockSize => Ok(Some(self.block_size)),
            IoctlOp::BlockErase => {
                if self.block_size != NATIVE_BLOCK_SIZE {
                    return Err(Error::InvalidArgument);
                }
                let offset = self.offset_of(arg, 0, NATIVE_BLOCK_SIZE as usize)?;
                medium.erase(self.part.address() + offset, NATIVE_BLOCK_SIZE)?;
                Ok(Some(0))
            }
            IoctlOp::Unknown(raw) => {
                log::debug!("ignoring unknown ioctl op {}", raw);
                Ok(None)
            }
        }
    }

    /// Compute the partition-relative offset of a request and check it
    /// against the partition bounds
    fn offset_of(&self, block: u32, sub_offset: u32, len: usize) -> Result<u32> {
        let offset = block
            .checked_mul(self.block_size)
            .and_then(|o| o.checked_add(sub_offset));
        let end = offset.and_then(|o| o.checked_add(len as u32));
        match (offset, end) {
            (Some(offset), Some(end)) if end <= self.part.size() => Ok(offset),
            _ => Err(Error::Io(Fault::OutOfRange {
                offset: offset.unwrap_or(u32::MAX),
                len: len as u32,
            })),
        }
    }

    /// Simple-write path: erase the target region, then write `data`
    ///
    /// A fault mid-protocol leaves the affected page in an
    /// indeterminate state; nothing is retried or rolled back here.
    fn erase_then_write<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let addr = self.part.address() + offset;
        let len = data.len() as u32;

        if self.block_size >= NATIVE_BLOCK_SIZE {
            // Block size is at least the native erase size, so the
            // region is page-aligned and can be erased exactly.
            medium.erase(addr, len)?;
        } else {
            self.erase_preserving_neighbors(medium, addr, len)?;
        }
        medium.write(addr, data)
    }

    /// Erase the native pages covering `[addr, addr + len)` while
    /// preserving live bytes outside that range
    ///
    /// Walks successive native pages. On the first page the bytes
    /// before the write region (the head) and on the last page the
    /// bytes after it (the tail) are captured into the scratch buffer
    /// before the erase and written back afterwards; middle pages need
    /// no capture. The partition base is page-aligned, so page
    /// boundaries computed on absolute addresses coincide with
    /// partition-relative ones.
    fn erase_preserving_neighbors<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        addr: u32,
        len: u32,
    ) -> Result<()> {
        // Allocated at construction whenever block_size < native size.
        let cache = self.scratch.as_mut().ok_or(Error::InvalidArgument)?;

        let mut page = addr - addr % NATIVE_BLOCK_SIZE;
        let mut head = addr % NATIVE_BLOCK_SIZE;
        let top = addr + len;

        while page < top {
            let page_end = page + NATIVE_BLOCK_SIZE;
            if head > 0 || top < page_end {
                // Head or tail bytes on this page must survive the
                // erase; capture the whole page first.
                log::trace!("caching native page at 0x{:08X}", page);
                medium.read(page, cache)?;
            }
            medium.erase(page, NATIVE_BLOCK_SIZE)?;
            if head > 0 {
                medium.write(page, &cache[..head as usize])?;
            }
            if top < page_end {
                let tail_start = (top - page) as usize;
                medium.write(top, &cache[tail_start..])?;
            }
            // Only the first page can have a head.
            head = 0;
            page = page_end;
        }
        Ok(())
    }
}

// Tests that drive the engine against the espart-dummy emulator live
// in tests/blockdev.rs: the dev-dependency cycle gives unit tests a
// second copy of this crate, so RamFlash cannot satisfy the unit-test
// build's FlashMedium trait. Only white-box tests remain here.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{subtype, Label, PartitionFlags, PartitionType};
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
    fn scratch_allocated_only_for_small_blocks() {
        let (_, h) = handle(512);
        assert!(h.scratch.is_some());
        let (_, h) = handle(PAGE);
        assert!(h.scratch.is_none());
        let (_, h) = handle(2 * PAGE);
        assert!(h.scratch.is_none());
        assert!(PartitionHandle::new(test_partition(0, PAGE), 0).is_err());
    }
}
