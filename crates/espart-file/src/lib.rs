//! espart-file - File-backed flash image support
//!
//! Stores the flash array in a regular file, so partition tables and
//! update sessions can be exercised against a persistent image on a
//! development host. The file is byte-addressed like raw flash; erase
//! fills the range with `0xFF`.
//!
//! # Example
//!
//! ```ignore
//! use espart_file::FileFlash;
//! use espart_core::FlashMedium;
//!
//! // Create a fresh 4 MiB image
//! let mut flash = FileFlash::create("flash.img", 4 * 1024 * 1024)?;
//!
//! // Read the first page
//! let mut buffer = vec![0u8; 4096];
//! flash.read(0, &mut buffer)?;
//! ```

#![warn(missing_docs)]

mod device;
mod error;

pub use device::FileFlash;
pub use error::{FileFlashError, Result};
