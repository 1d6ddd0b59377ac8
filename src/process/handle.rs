//! Current-process handle

use crate::core::types::{Address, MemoryResult};
use crate::memory::regions::RegionInfo;
#[cfg(target_os = "linux")]
use crate::memory::regions::{Protection, RegionState, RegionType};
use crate::memory::{FaultIsolatedAccess, RegionQuery};
use std::fmt;

/// Handle on the current process
///
/// Holds no OS resources: Windows uses the current-process pseudo-handle and
/// Linux addresses the process by its own pid.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProcess {
    pid: u32,
}

impl HostProcess {
    pub fn current() -> Self {
        HostProcess {
            pid: std::process::id(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for HostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host process {}", self.pid)
    }
}

#[cfg(windows)]
impl FaultIsolatedAccess for HostProcess {
    fn read_raw(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        use crate::windows::kernel32;
        unsafe { kernel32::read_process_memory(kernel32::current_process(), address.as_usize(), buffer) }
    }

    fn write_raw(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        use crate::windows::kernel32;
        unsafe { kernel32::write_process_memory(kernel32::current_process(), address.as_usize(), data) }
    }
}

#[cfg(windows)]
impl RegionQuery for HostProcess {
    fn regions(&self) -> MemoryResult<Vec<RegionInfo>> {
        crate::windows::enumerate_regions()
    }

    fn query(&self, address: Address) -> MemoryResult<RegionInfo> {
        crate::windows::query_region(address)
    }
}

#[cfg(target_os = "linux")]
impl FaultIsolatedAccess for HostProcess {
    fn read_raw(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        crate::linux::read_memory(address, buffer)
    }

    fn write_raw(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        crate::linux::write_memory(address, data)
    }
}

#[cfg(target_os = "linux")]
impl RegionQuery for HostProcess {
    fn regions(&self) -> MemoryResult<Vec<RegionInfo>> {
        crate::linux::read_self_maps()
    }

    fn query(&self, address: Address) -> MemoryResult<RegionInfo> {
        let regions = crate::linux::read_self_maps()?;
        Ok(regions
            .into_iter()
            .find(|region| region.contains(address))
            .unwrap_or(RegionInfo {
                base_address: address,
                size: 0,
                state: RegionState::Free,
                region_type: RegionType::Private,
                protection: Protection::NO_ACCESS,
            }))
    }
}
