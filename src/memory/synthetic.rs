//! In-memory stand-in for a host address space
//!
//! `SyntheticMemory` owns byte buffers placed at arbitrary virtual
//! addresses. It implements the same capabilities as the real host process,
//! so the scanner, registry and session can be exercised without touching
//! real process memory.

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::regions::{Protection, RegionInfo, RegionState, RegionType};
use crate::memory::{FaultIsolatedAccess, RegionQuery};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct SyntheticRegion {
    info: RegionInfo,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Layout {
    regions: Vec<SyntheticRegion>,
    faults: Vec<(Address, usize)>,
}

/// Sparse synthetic address space
#[derive(Default)]
pub struct SyntheticMemory {
    layout: RwLock<Layout>,
}

impl SyntheticMemory {
    /// Create an empty address space
    pub fn new() -> Self {
        SyntheticMemory::default()
    }

    /// Add a committed, private, read-write region of `size` zeroed bytes
    pub fn with_region(self, base: Address, size: usize) -> Self {
        self.with_region_info(RegionInfo::private_read_write(base, size))
    }

    /// Add a region described by `info`, backed by zeroed bytes
    pub fn with_region_info(self, info: RegionInfo) -> Self {
        self.map(info);
        self
    }

    /// Make `[base, base + len)` fault on every access while staying listed
    pub fn with_fault(self, base: Address, len: usize) -> Self {
        self.layout_mut().faults.push((base, len));
        self
    }

    /// Add a region at runtime
    pub fn map(&self, info: RegionInfo) {
        let bytes = vec![0u8; info.size];
        let mut layout = self.layout_mut();
        layout.regions.push(SyntheticRegion { info, bytes });
        layout
            .regions
            .sort_by_key(|region| region.info.base_address);
    }

    /// Store bytes regardless of page protection
    pub fn poke(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let mut layout = self.layout_mut();
        let region = layout
            .regions
            .iter_mut()
            .find(|region| region.info.contains_range(address, data.len()))
            .ok_or_else(|| MemoryError::write_failed(address, "address not mapped"))?;

        let offset = address.as_usize() - region.info.base_address.as_usize();
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Load bytes regardless of page protection
    pub fn peek(&self, address: Address, len: usize) -> MemoryResult<Vec<u8>> {
        let layout = self.layout();
        let region = layout
            .regions
            .iter()
            .find(|region| region.info.contains_range(address, len))
            .ok_or_else(|| MemoryError::read_failed(address, "address not mapped"))?;

        let offset = address.as_usize() - region.info.base_address.as_usize();
        Ok(region.bytes[offset..offset + len].to_vec())
    }

    fn layout(&self) -> RwLockReadGuard<'_, Layout> {
        self.layout.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn layout_mut(&self) -> RwLockWriteGuard<'_, Layout> {
        self.layout.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Layout {
    fn faults_on(&self, address: Address, len: usize) -> bool {
        let start = address.as_usize();
        let end = start.saturating_add(len);
        self.faults.iter().any(|(base, fault_len)| {
            let fault_start = base.as_usize();
            let fault_end = fault_start.saturating_add(*fault_len);
            start < fault_end && fault_start < end
        })
    }

    fn accessible(&self, address: Address, len: usize, write: bool) -> Option<usize> {
        if self.faults_on(address, len) {
            return None;
        }
        let index = self
            .regions
            .iter()
            .position(|region| region.info.contains_range(address, len))?;
        let info = &self.regions[index].info;
        let allowed = if write {
            info.is_writable()
        } else {
            info.is_readable()
        };
        allowed.then_some(index)
    }
}

impl FaultIsolatedAccess for SyntheticMemory {
    fn read_raw(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let layout = self.layout();
        let index = layout
            .accessible(address, buffer.len(), false)
            .ok_or_else(|| MemoryError::read_failed(address, "access violation"))?;

        let region = &layout.regions[index];
        let offset = address.as_usize() - region.info.base_address.as_usize();
        buffer.copy_from_slice(&region.bytes[offset..offset + buffer.len()]);
        Ok(())
    }

    fn write_raw(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let mut layout = self.layout_mut();
        let index = layout
            .accessible(address, data.len(), true)
            .ok_or_else(|| MemoryError::write_failed(address, "access violation"))?;

        let region = &mut layout.regions[index];
        let offset = address.as_usize() - region.info.base_address.as_usize();
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl RegionQuery for SyntheticMemory {
    fn regions(&self) -> MemoryResult<Vec<RegionInfo>> {
        Ok(self
            .layout()
            .regions
            .iter()
            .map(|region| region.info.clone())
            .collect())
    }

    fn query(&self, address: Address) -> MemoryResult<RegionInfo> {
        let layout = self.layout();
        if let Some(region) = layout
            .regions
            .iter()
            .find(|region| region.info.contains(address))
        {
            return Ok(region.info.clone());
        }

        // Unmapped gaps answer like the OS would: a free range
        Ok(RegionInfo {
            base_address: address,
            size: 0,
            state: RegionState::Free,
            region_type: RegionType::Private,
            protection: Protection::NO_ACCESS,
        })
    }
}
