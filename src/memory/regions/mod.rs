//! Memory region model shared by every host platform
//!
//! Regions are described in platform-neutral terms so the main RAM scanner
//! can run unchanged against Windows `VirtualQueryEx` results, Linux
//! `/proc/self/maps` entries or synthetic test memory.

pub mod filter;

pub use filter::{FilterCriteria, RegionFilter};

use crate::core::types::Address;

/// State of a memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Memory is committed and backed
    Committed,
    /// Address space is reserved but not backed
    Reserved,
    /// Memory is free/unallocated
    Free,
}

/// Type of memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionType {
    /// Private, anonymous memory (heaps, stacks, private allocations)
    Private,
    /// Mapped memory (file mapping, shared memory)
    Mapped,
    /// Image memory (executable/library)
    Image,
}

/// Page protection of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protection {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    /// Writes are copy-on-write
    pub copy_on_write: bool,
    /// Guard, no-cache or write-combine modifiers are present
    pub modified: bool,
}

impl Protection {
    /// Plain read-write pages
    pub const READ_WRITE: Self = Self {
        readable: true,
        writable: true,
        executable: false,
        copy_on_write: false,
        modified: false,
    };

    /// Plain read-write-execute pages
    pub const READ_WRITE_EXECUTE: Self = Self {
        readable: true,
        writable: true,
        executable: true,
        copy_on_write: false,
        modified: false,
    };

    /// Read-only pages
    pub const READ_ONLY: Self = Self {
        readable: true,
        writable: false,
        executable: false,
        copy_on_write: false,
        modified: false,
    };

    /// Inaccessible pages
    pub const NO_ACCESS: Self = Self {
        readable: false,
        writable: false,
        executable: false,
        copy_on_write: false,
        modified: false,
    };

    /// Exactly read-write or read-write-execute, with no modifiers
    pub fn is_plain_read_write(&self) -> bool {
        *self == Self::READ_WRITE || *self == Self::READ_WRITE_EXECUTE
    }
}

/// Information about a memory region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    /// Base address of the region
    pub base_address: Address,
    /// Size of the region in bytes
    pub size: usize,
    /// Current state of the region
    pub state: RegionState,
    /// Type of the region
    pub region_type: RegionType,
    /// Protection of the region's pages
    pub protection: Protection,
}

impl RegionInfo {
    /// Private, committed, read-write region (the shape of a heap block)
    pub fn private_read_write(base_address: Address, size: usize) -> Self {
        RegionInfo {
            base_address,
            size,
            state: RegionState::Committed,
            region_type: RegionType::Private,
            protection: Protection::READ_WRITE,
        }
    }

    /// Check if the region is committed
    pub fn is_committed(&self) -> bool {
        self.state == RegionState::Committed
    }

    /// Check if the region can be read
    pub fn is_readable(&self) -> bool {
        self.is_committed() && self.protection.readable
    }

    /// Check if the region can be written
    pub fn is_writable(&self) -> bool {
        self.is_committed() && self.protection.writable
    }

    /// Get the end address of the region
    pub fn end_address(&self) -> Address {
        self.base_address.add(self.size)
    }

    /// Check if an address is within this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }

    /// Check if the whole range `[address, address + len)` is within this region
    pub fn contains_range(&self, address: Address, len: usize) -> bool {
        match address.offset_from(self.base_address) {
            Some(offset) => offset
                .checked_add(len)
                .map_or(false, |end| end <= self.size),
            None => false,
        }
    }

    /// Bytes left in the region starting at `address`, zero if outside
    pub fn remaining_from(&self, address: Address) -> usize {
        if !self.contains(address) {
            return 0;
        }
        self.end_address().as_usize() - address.as_usize()
    }
}
