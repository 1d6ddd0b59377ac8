//! Memory region information wrapper

use crate::core::types::Address;
use crate::memory::regions::{Protection, RegionInfo, RegionState, RegionType};
use winapi::um::winnt::MEMORY_BASIC_INFORMATION;

const MEM_COMMIT: u32 = 0x1000;
const MEM_RESERVE: u32 = 0x2000;
const MEM_PRIVATE: u32 = 0x20000;
const MEM_MAPPED: u32 = 0x40000;

const PAGE_READONLY: u32 = 0x02;
const PAGE_READWRITE: u32 = 0x04;
const PAGE_WRITECOPY: u32 = 0x08;
const PAGE_EXECUTE: u32 = 0x10;
const PAGE_EXECUTE_READ: u32 = 0x20;
const PAGE_EXECUTE_READWRITE: u32 = 0x40;
const PAGE_EXECUTE_WRITECOPY: u32 = 0x80;
const PAGE_MODIFIERS: u32 = 0x100 | 0x200 | 0x400; // guard, nocache, writecombine

/// Wrapper for MEMORY_BASIC_INFORMATION
#[derive(Debug, Clone)]
pub struct MemoryBasicInfo {
    pub base_address: Address,
    pub region_size: usize,
    pub state: u32,
    pub protect: u32,
    pub type_flags: u32,
}

impl From<MEMORY_BASIC_INFORMATION> for MemoryBasicInfo {
    fn from(mbi: MEMORY_BASIC_INFORMATION) -> Self {
        MemoryBasicInfo {
            base_address: Address::new(mbi.BaseAddress as usize),
            region_size: mbi.RegionSize,
            state: mbi.State,
            protect: mbi.Protect,
            type_flags: mbi.Type,
        }
    }
}

impl MemoryBasicInfo {
    pub fn state(&self) -> RegionState {
        match self.state {
            MEM_COMMIT => RegionState::Committed,
            MEM_RESERVE => RegionState::Reserved,
            _ => RegionState::Free,
        }
    }

    pub fn region_type(&self) -> RegionType {
        match self.type_flags {
            MEM_PRIVATE => RegionType::Private,
            MEM_MAPPED => RegionType::Mapped,
            _ => RegionType::Image,
        }
    }

    pub fn protection(&self) -> Protection {
        let base = self.protect & !PAGE_MODIFIERS;
        let (readable, writable, executable, copy_on_write) = match base {
            PAGE_READONLY => (true, false, false, false),
            PAGE_READWRITE => (true, true, false, false),
            PAGE_WRITECOPY => (true, true, false, true),
            PAGE_EXECUTE => (false, false, true, false),
            PAGE_EXECUTE_READ => (true, false, true, false),
            PAGE_EXECUTE_READWRITE => (true, true, true, false),
            PAGE_EXECUTE_WRITECOPY => (true, true, true, true),
            // PAGE_NOACCESS and unknown values
            _ => (false, false, false, false),
        };

        Protection {
            readable,
            writable,
            executable,
            copy_on_write,
            modified: self.protect & PAGE_MODIFIERS != 0,
        }
    }

    pub fn to_region_info(&self) -> RegionInfo {
        RegionInfo {
            base_address: self.base_address,
            size: self.region_size,
            state: self.state(),
            region_type: self.region_type(),
            protection: self.protection(),
        }
    }
}
