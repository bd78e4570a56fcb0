//! Flash medium access trait
//!
//! The medium exposes three primitive operations: byte-granular reads,
//! byte-granular writes into previously-erased cells, and erase of
//! native-size-aligned ranges. Everything above this trait (block
//! device, OTA staging) is built from these three primitives.

use crate::error::Result;

/// Smallest region the medium can erase in one operation.
///
/// Reads and writes can operate on arbitrary byte ranges, but erase
/// only works on whole 4 KiB pages. The default logical block size of a
/// partition handle is therefore also 4 KiB, which makes writes
/// efficient and plays well with filesystems like littlefs. Smaller
/// logical block sizes are supported through a scratch buffer at the
/// cost of extra medium traffic.
pub const NATIVE_BLOCK_SIZE: u32 = 4096;

/// Byte value of an erased flash cell
pub const ERASED_BYTE: u8 = 0xFF;

/// Access to a raw flash medium
///
/// Implementations are expected to serialize against concurrent
/// hardware access themselves; this crate performs no cross-handle
/// coordination. All operations are synchronous and run to completion
/// on the calling thread.
pub trait FlashMedium {
    /// Total medium size in bytes
    fn size(&self) -> u32;

    /// Read `buf.len()` bytes starting at the absolute byte offset `addr`
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at the absolute byte offset `addr`
    ///
    /// The target cells must have been erased beforehand; writing over
    /// non-erased cells is a medium-level fault.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase `len` bytes starting at `addr`
    ///
    /// Both `addr` and `len` must be multiples of [`NATIVE_BLOCK_SIZE`].
    fn erase(&mut self, addr: u32, len: u32) -> Result<()>;
}

// Blanket impl for boxed media to allow trait objects
#[cfg(feature = "alloc")]
impl FlashMedium for alloc::boxed::Box<dyn FlashMedium + Send> {
    fn size(&self) -> u32 {
        (**self).size()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        (**self).erase(addr, len)
    }
}
