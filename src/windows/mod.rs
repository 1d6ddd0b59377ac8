//! Windows host layer
//!
//! `ReadProcessMemory` / `WriteProcessMemory` against the current-process
//! pseudo-handle report protection faults as a failed call instead of an
//! access violation, which is what makes speculative scanning safe.
//! All unsafe FFI calls are contained within this module.

pub mod bindings;
pub mod types;

pub use bindings::kernel32;
pub use types::MemoryBasicInfo;

use crate::core::types::{Address, MemoryResult};
use crate::memory::regions::RegionInfo;

/// Walk the whole address space of the current process
pub fn enumerate_regions() -> MemoryResult<Vec<RegionInfo>> {
    let process = kernel32::current_process();
    let mut regions = Vec::new();
    let mut cursor = 0usize;

    // VirtualQueryEx fails past the highest user-mode address
    while let Ok(mbi) = unsafe { kernel32::virtual_query_ex(process, cursor) } {
        let info = MemoryBasicInfo::from(mbi);
        if info.region_size == 0 {
            break;
        }
        let next = info.base_address.as_usize().checked_add(info.region_size);
        regions.push(info.to_region_info());
        match next {
            Some(next) if next > cursor => cursor = next,
            _ => break,
        }
    }

    Ok(regions)
}

/// Describe the region containing `address`
pub fn query_region(address: Address) -> MemoryResult<RegionInfo> {
    let process = kernel32::current_process();
    let mbi = unsafe { kernel32::virtual_query_ex(process, address.as_usize())? };
    Ok(MemoryBasicInfo::from(mbi).to_region_info())
}
