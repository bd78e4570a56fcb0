//! Partition descriptor types

use core::fmt;

use crate::error::{Error, Result};
use bitflags::bitflags;

/// Maximum partition label length in bytes (fixed label field in the
/// on-flash partition table format)
pub const LABEL_MAX: usize = 16;

/// Partition label - short string, unique within a table
pub type Label = heapless::String<LABEL_MAX>;

/// Well-known partition subtype values
pub mod subtype {
    /// Factory application slot
    pub const APP_FACTORY: u8 = 0x00;
    /// First OTA application slot; slots `ota_0`..`ota_15` occupy
    /// `0x10..=0x1F`
    pub const APP_OTA_MIN: u8 = 0x10;
    /// Last OTA application slot
    pub const APP_OTA_MAX: u8 = 0x1F;
    /// OTA selection data
    pub const DATA_OTA: u8 = 0x00;
    /// Key-value storage
    pub const DATA_NVS: u8 = 0x02;
    /// Generic filesystem data
    pub const DATA_FAT: u8 = 0x81;
}

/// Partition type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    /// Application image
    App,
    /// Data (filesystem, NVS, OTA selection, ...)
    Data,
}

impl PartitionType {
    /// Raw type value as stored in the partition table
    pub fn as_raw(self) -> u8 {
        match self {
            Self::App => 0x00,
            Self::Data => 0x01,
        }
    }

    /// Parse a raw type value
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0x00 => Ok(Self::App),
            0x01 => Ok(Self::Data),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Fixed partition roles resolvable without a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Partition selected for the next boot
    Boot,
    /// Partition the current firmware was loaded from
    Running,
}

impl Role {
    /// Parse a raw role constant (`BOOT` = 0, `RUNNING` = 1)
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Boot),
            1 => Ok(Self::Running),
            _ => Err(Error::InvalidArgument),
        }
    }
}

bitflags! {
    /// Per-partition flags from the partition table
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PartitionFlags: u32 {
        /// Contents are stored encrypted on the medium
        const ENCRYPTED = 1 << 0;
        /// Partition must not be written
        const READONLY = 1 << 1;
    }
}

impl Default for PartitionFlags {
    fn default() -> Self {
        PartitionFlags::empty()
    }
}

/// A contiguous byte range on the medium, tagged with metadata
///
/// Immutable once resolved. Base address and size are always multiples
/// of the native erase size; the table validates this at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    ptype: PartitionType,
    subtype: u8,
    address: u32,
    size: u32,
    label: Label,
    flags: PartitionFlags,
}

impl Partition {
    /// Create a new descriptor
    ///
    /// Alignment and bounds are validated by [`PartitionTable`], not
    /// here.
    ///
    /// [`PartitionTable`]: super::PartitionTable
    pub fn new(
        ptype: PartitionType,
        subtype: u8,
        address: u32,
        size: u32,
        label: Label,
        flags: PartitionFlags,
    ) -> Self {
        Self {
            ptype,
            subtype,
            address,
            size,
            label,
            flags,
        }
    }

    /// Partition type
    pub fn ptype(&self) -> PartitionType {
        self.ptype
    }

    /// Partition subtype
    pub fn subtype(&self) -> u8 {
        self.subtype
    }

    /// Base address in bytes
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Flags
    pub fn flags(&self) -> PartitionFlags {
        self.flags
    }

    /// Whether the contents are encrypted on the medium
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(PartitionFlags::ENCRYPTED)
    }

    /// Whether this is an OTA application slot (`ota_0`..`ota_15`)
    pub fn is_ota_slot(&self) -> bool {
        self.ptype == PartitionType::App
            && (subtype::APP_OTA_MIN..=subtype::APP_OTA_MAX).contains(&self.subtype)
    }

    /// Metadata tuple: (type, subtype, address, size, label, encrypted)
    pub fn info(&self) -> (u8, u8, u32, u32, &str, bool) {
        (
            self.ptype.as_raw(),
            self.subtype,
            self.address,
            self.size,
            &self.label,
            self.is_encrypted(),
        )
    }

    /// Check whether this partition overlaps another byte range
    pub fn overlaps(&self, address: u32, size: u32) -> bool {
        self.address < address.saturating_add(size) && address < self.address.saturating_add(self.size)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Partition type={}, subtype={}, address=0x{:X}, size=0x{:X}, label={}, encrypted={}>",
            self.ptype.as_raw(),
            self.subtype,
            self.address,
            self.size,
            self.label.as_str(),
            self.is_encrypted(),
        )
    }
}
