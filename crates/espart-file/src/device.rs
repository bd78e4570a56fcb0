//! File-backed flash image

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use espart_core::{Error, Fault, FlashMedium, NATIVE_BLOCK_SIZE};

use crate::error::{FileFlashError, Result};

/// Byte value of erased flash
const ERASED: u8 = 0xFF;

/// A flash image stored in a regular file
///
/// The file plays the role of the raw flash array: reads and writes go
/// through at byte granularity, and erase fills the range with `0xFF`.
/// NOR program semantics (no setting bits back to one without an
/// erase) are not enforced here; the engine on top is responsible for
/// erase-before-write.
pub struct FileFlash {
    file: File,
    size: u32,
}

impl FileFlash {
    /// Open an existing image file
    ///
    /// The file size must be a non-zero multiple of the native erase
    /// size and fit the 32-bit address space.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FileFlashError::NotFound(path.display().to_string()));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let size = validate_size(len)?;
        debug!("opened image {} ({} bytes)", path.display(), size);
        Ok(Self { file, size })
    }

    /// Create a fresh image file of `size` bytes, fully erased
    ///
    /// An existing file at `path` is truncated and replaced.
    pub fn create(path: impl AsRef<Path>, size: u32) -> Result<Self> {
        let path = path.as_ref();
        validate_size(size as u64)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let blank = [ERASED; NATIVE_BLOCK_SIZE as usize];
        let mut remaining = size as usize;
        while remaining > 0 {
            let step = remaining.min(blank.len());
            file.write_all(&blank[..step])?;
            remaining -= step;
        }
        file.flush()?;
        debug!("created image {} ({} bytes)", path.display(), size);
        Ok(Self { file, size })
    }

    /// Total image size in bytes
    pub fn len(&self) -> u32 {
        self.size
    }

    /// Whether the image holds no bytes (never true for a validated
    /// image)
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn check_range(&self, addr: u32, len: usize) -> espart_core::Result<()> {
        let end = (addr as u64) + (len as u64);
        if end > self.size as u64 {
            return Err(Error::Io(Fault::OutOfRange {
                offset: addr,
                len: len as u32,
            }));
        }
        Ok(())
    }

    fn seek_to(&mut self, addr: u32) -> espart_core::Result<()> {
        self.file
            .seek(SeekFrom::Start(addr as u64))
            .map_err(|e| io_fault(&e))?;
        Ok(())
    }
}

fn validate_size(len: u64) -> Result<u32> {
    if len == 0 {
        return Err(FileFlashError::EmptyImage);
    }
    if len > u32::MAX as u64 {
        return Err(FileFlashError::TooLarge(len));
    }
    if len % NATIVE_BLOCK_SIZE as u64 != 0 {
        return Err(FileFlashError::UnalignedSize(len));
    }
    Ok(len as u32)
}

fn io_fault(e: &std::io::Error) -> Error {
    Error::Io(Fault::Device(e.raw_os_error().unwrap_or(-1)))
}

impl FlashMedium for FileFlash {
    fn size(&self) -> u32 {
        self.size
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> espart_core::Result<()> {
        self.check_range(addr, buf.len())?;
        self.seek_to(addr)?;
        self.file.read_exact(buf).map_err(|e| io_fault(&e))
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> espart_core::Result<()> {
        self.check_range(addr, data.len())?;
        self.seek_to(addr)?;
        self.file.write_all(data).map_err(|e| io_fault(&e))?;
        self.file.flush().map_err(|e| io_fault(&e))
    }

    fn erase(&mut self, addr: u32, len: u32) -> espart_core::Result<()> {
        self.check_range(addr, len as usize)?;
        self.seek_to(addr)?;
        let blank = [ERASED; NATIVE_BLOCK_SIZE as usize];
        let mut remaining = len as usize;
        while remaining > 0 {
            let step = remaining.min(blank.len());
            self.file
                .write_all(&blank[..step])
                .map_err(|e| io_fault(&e))?;
            remaining -= step;
        }
        self.file.flush().map_err(|e| io_fault(&e))
    }
}
