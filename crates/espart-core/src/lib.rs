//! espart-core - Flash partitions as block devices, with OTA staging
//!
//! This crate exposes a raw flash partition as a generic block device
//! with a configurable logical block size, on top of a medium that can
//! only erase at a fixed native granularity (4096 bytes) but supports
//! byte-granular reads and writes within an erased region. When the
//! logical block size is smaller than the native erase size, writes go
//! through a read-erase-modify-write protocol that preserves
//! neighboring data sharing the same native page.
//!
//! It also provides a write-session engine for staging firmware images
//! into a target partition (begin/write/write_at/end/abort).
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and
//!   TOML partition-table loading)
//! - `alloc` - Enable heap allocation (block device, OTA engine,
//!   partition table)
//!
//! # Example
//!
//! ```ignore
//! use espart_core::blockdev::PartitionHandle;
//! use espart_core::medium::FlashMedium;
//!
//! fn dump_first_block<M: FlashMedium>(medium: &mut M, handle: &PartitionHandle) {
//!     let mut buf = vec![0u8; handle.block_size() as usize];
//!     handle.read_blocks(medium, 0, &mut buf, None).unwrap();
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "alloc")]
pub mod blockdev;
pub mod error;
#[cfg(feature = "alloc")]
pub mod image;
pub mod medium;
#[cfg(feature = "alloc")]
pub mod ota;
pub mod partition;

pub use error::{Error, Fault, ImageFault, Result};
pub use medium::{FlashMedium, NATIVE_BLOCK_SIZE};
