//! Partition table
//!
//! An ordered, validated collection of partition descriptors with
//! label lookup, filtered enumeration and role resolution.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::blockdev::PartitionHandle;
use crate::error::{Error, Result};
use crate::medium::NATIVE_BLOCK_SIZE;
use crate::partition::{Partition, PartitionType, Role};

/// A validated partition table
///
/// Descriptors are shared read-only (`Arc`); handles produced by
/// lookup reference the same descriptor. The table also records which
/// entry is the boot partition and which is the running partition, so
/// fixed roles can be resolved without a label.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    parts: Vec<Arc<Partition>>,
    boot: Option<usize>,
    running: Option<usize>,
}

impl PartitionTable {
    /// Build a table from descriptors, validating alignment, overlap
    /// and label uniqueness
    pub fn from_parts(parts: Vec<Partition>) -> Result<Self> {
        let table = Self {
            parts: parts.into_iter().map(Arc::new).collect(),
            boot: None,
            running: None,
        };
        table.validate(None)?;
        Ok(table)
    }

    /// Validate the table, optionally against a known medium size
    ///
    /// Checks that every partition is native-erase-size aligned in
    /// both base address and size, that no two partitions overlap, and
    /// that labels are unique.
    pub fn validate(&self, medium_size: Option<u32>) -> Result<()> {
        for part in &self.parts {
            if part.address() % NATIVE_BLOCK_SIZE != 0
                || part.size() % NATIVE_BLOCK_SIZE != 0
                || part.size() == 0
            {
                return Err(Error::InvalidArgument);
            }
            if let Some(total) = medium_size {
                let end = part.address() as u64 + part.size() as u64;
                if end > total as u64 {
                    return Err(Error::InvalidArgument);
                }
            }
        }
        for (i, a) in self.parts.iter().enumerate() {
            for b in self.parts.iter().skip(i + 1) {
                if a.overlaps(b.address(), b.size()) {
                    return Err(Error::InvalidArgument);
                }
                if a.label().eq_ignore_ascii_case(b.label()) {
                    return Err(Error::InvalidArgument);
                }
            }
        }
        Ok(())
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterate over all descriptors in table order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Partition>> {
        self.parts.iter()
    }

    /// First partition matching the given filters
    ///
    /// `None` filters match everything of that kind.
    pub fn find_first(
        &self,
        ptype: PartitionType,
        subtype: Option<u8>,
        label: Option<&str>,
    ) -> Option<&Arc<Partition>> {
        self.parts.iter().find(|p| {
            p.ptype() == ptype
                && subtype.is_none_or(|s| p.subtype() == s)
                && label.is_none_or(|l| p.label() == l)
        })
    }

    /// Locate a partition by label, searching app-type partitions
    /// first, then data-type
    pub fn lookup_label(&self, label: &str) -> Result<&Arc<Partition>> {
        self.find_first(PartitionType::App, None, Some(label))
            .or_else(|| self.find_first(PartitionType::Data, None, Some(label)))
            .ok_or(Error::NotFound)
    }

    /// Resolve a fixed role to its partition
    pub fn resolve(&self, role: Role) -> Result<&Arc<Partition>> {
        let idx = match role {
            Role::Boot => self.boot,
            Role::Running => self.running,
        };
        idx.and_then(|i| self.parts.get(i)).ok_or(Error::NotFound)
    }

    /// Mark the partition with this label as the boot partition
    pub fn set_boot(&mut self, label: &str) -> Result<()> {
        let idx = self.index_of(label)?;
        self.boot = Some(idx);
        Ok(())
    }

    /// Mark the partition with this label as the running partition
    pub fn set_running(&mut self, label: &str) -> Result<()> {
        let idx = self.index_of(label)?;
        self.running = Some(idx);
        Ok(())
    }

    /// Enumerate all partitions matching the filters, each wrapped in
    /// a fresh handle at the requested block size
    ///
    /// The sequence is materialized eagerly and ordered as in the
    /// table; empty filters match everything of that type.
    pub fn find(
        &self,
        ptype: PartitionType,
        subtype: Option<u8>,
        label: Option<&str>,
        block_size: u32,
    ) -> Result<Vec<PartitionHandle>> {
        self.parts
            .iter()
            .filter(|p| {
                p.ptype() == ptype
                    && subtype.is_none_or(|s| p.subtype() == s)
                    && label.is_none_or(|l| p.label() == l)
            })
            .map(|p| PartitionHandle::new(Arc::clone(p), block_size))
            .collect()
    }

    fn index_of(&self, label: &str) -> Result<usize> {
        self.parts
            .iter()
            .position(|p| p.label() == label)
            .ok_or(Error::NotFound)
    }
}
