//! Partition model
//!
//! Partition descriptors, the partition table with lookup and role
//! resolution, and (with `std`) TOML table loading.

#[cfg(feature = "alloc")]
mod table;
#[cfg(feature = "std")]
pub mod toml;
mod types;

#[cfg(feature = "alloc")]
pub use table::PartitionTable;
pub use types::{subtype, Label, Partition, PartitionFlags, PartitionType, Role, LABEL_MAX};
