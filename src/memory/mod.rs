//! Host memory access, region enumeration and main RAM acquisition
//!
//! This module provides:
//! - The [`FaultIsolatedAccess`] capability: width-typed reads and writes that
//!   turn access faults into `Err` values instead of crashing the host
//! - The [`RegionQuery`] capability: enumeration of the host's memory regions
//! - The heap scanner that locates the emulator's main RAM block
//! - Translation of emulator addresses into host addresses

pub mod regions;
pub mod scanner;
pub mod synthetic;
pub mod target;

pub use regions::{FilterCriteria, Protection, RegionFilter, RegionInfo, RegionState, RegionType};
pub use scanner::{MainRamScanner, ScanOptions, DSI_MAIN_RAM_MASK, NDS_MAIN_RAM_MASK};
pub use synthetic::SyntheticMemory;
pub use target::{MainRam, RamKind, TargetRegion, MAIN_RAM_START};

use crate::core::types::{Address, MemoryResult, Width};

/// Fault-isolated access to host memory
///
/// Implementations must never let an invalid address terminate the process:
/// unmapped, protected or otherwise inaccessible ranges are reported as
/// `MemoryError::ReadFailed` / `MemoryError::WriteFailed`. There are no retries.
pub trait FaultIsolatedAccess: Send + Sync {
    /// Fill `buffer` from `address`. Partial reads are failures.
    fn read_raw(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Store `data` at `address`. Partial writes are failures.
    fn write_raw(&self, address: Address, data: &[u8]) -> MemoryResult<()>;

    /// Read a little-endian value of `width` bytes, zero-extended
    fn read(&self, address: Address, width: Width) -> MemoryResult<u32> {
        let mut buffer = [0u8; 4];
        self.read_raw(address, &mut buffer[..width.bytes()])?;
        Ok(width.decode(&buffer))
    }

    /// Write the low `width` bytes of `value`, little-endian
    fn write(&self, address: Address, width: Width, value: u32) -> MemoryResult<()> {
        self.write_raw(address, &width.encode(value))
    }

    /// Read a host pointer
    fn read_pointer(&self, address: Address) -> MemoryResult<Address> {
        let mut buffer = [0u8; std::mem::size_of::<usize>()];
        self.read_raw(address, &mut buffer)?;
        Ok(Address::new(usize::from_le_bytes(buffer)))
    }
}

/// Enumeration of the host's memory regions
pub trait RegionQuery: Send + Sync {
    /// All regions of the address space, in ascending base-address order
    fn regions(&self) -> MemoryResult<Vec<RegionInfo>>;

    /// The region containing `address`
    fn query(&self, address: Address) -> MemoryResult<RegionInfo>;
}

/// A host that can be both scanned and accessed
pub trait HostMemory: FaultIsolatedAccess + RegionQuery {}

impl<T: FaultIsolatedAccess + RegionQuery + ?Sized> HostMemory for T {}
