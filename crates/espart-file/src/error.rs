//! Error types for file-backed flash images

use std::io;
use thiserror::Error;

use espart_core::NATIVE_BLOCK_SIZE;

/// File image errors
#[derive(Debug, Error)]
pub enum FileFlashError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Image file not found
    #[error("image file not found: {0}")]
    NotFound(String),

    /// Image size is not a multiple of the native erase size
    #[error("image size {0} is not a multiple of {NATIVE_BLOCK_SIZE} bytes")]
    UnalignedSize(u64),

    /// Image size does not fit the 32-bit address space
    #[error("image size {0} exceeds the 32-bit address space")]
    TooLarge(u64),

    /// Requested size is zero
    #[error("image size must be non-zero")]
    EmptyImage,

    /// Seek error
    #[error("seek to offset {offset:#x} failed: {source}")]
    SeekFailed {
        offset: u32,
        #[source]
        source: io::Error,
    },

    /// Read error
    #[error("read of {len} bytes at offset {offset:#x} failed: {source}")]
    ReadFailed {
        offset: u32,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Write error
    #[error("write of {len} bytes at offset {offset:#x} failed: {source}")]
    WriteFailed {
        offset: u32,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Result type for file image operations
pub type Result<T> = std::result::Result<T, FileFlashError>;
