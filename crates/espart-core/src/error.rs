//! Error types for espart-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Details about a medium-level I/O fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The underlying medium reported a failure; wraps its status code
    /// verbatim for diagnostics
    Device(i32),
    /// The requested range falls outside the addressable bounds
    OutOfRange {
        /// Offset where the operation was attempted
        offset: u32,
        /// Length of the attempted operation in bytes
        len: u32,
    },
}

/// Reason a staged image failed finalize-time validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFault {
    /// Fewer bytes were staged than the session's expected image size
    Truncated,
    /// The image does not start with the firmware-image magic byte
    BadMagic,
    /// The application descriptor is missing or malformed
    BadAppDesc,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Lookup yielded no matching partition
    NotFound,
    /// Unrecognized role/type constant, or an operation that cannot be
    /// expressed safely with the current block size
    InvalidArgument,
    /// Update-session token was never issued
    BadHandle,
    /// Update-session token refers to a finalized or aborted session
    SessionClosed,
    /// A read/write/erase primitive failed
    Io(Fault),
    /// Finalize-time image check failed
    ValidationFailed(ImageFault),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(status) => write!(f, "medium reported status {}", status),
            Self::OutOfRange { offset, len } => {
                write!(f, "range out of bounds: {} bytes at offset 0x{:08X}", len, offset)
            }
        }
    }
}

impl fmt::Display for ImageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "staged image is incomplete"),
            Self::BadMagic => write!(f, "image magic byte mismatch"),
            Self::BadAppDesc => write!(f, "application descriptor missing or malformed"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no matching partition found"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::BadHandle => write!(f, "unknown update-session handle"),
            Self::SessionClosed => write!(f, "update session already finalized or aborted"),
            Self::Io(fault) => write!(f, "I/O fault: {}", fault),
            Self::ValidationFailed(fault) => write!(f, "image validation failed: {}", fault),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
