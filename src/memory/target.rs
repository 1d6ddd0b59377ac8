//! Emulator main RAM: the located region and address translation

use crate::core::types::{Address, MemoryResult, TargetAddress, Width};
use crate::memory::FaultIsolatedAccess;
use crate::registry::ValueProvider;
use serde::Serialize;
use std::fmt;

/// First address of main RAM in the emulated address space
pub const MAIN_RAM_START: TargetAddress = 0x0200_0000;

/// Flavour of main RAM, identified by its addressing mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RamKind {
    /// 4 MiB main RAM
    Nds,
    /// 16 MiB main RAM
    Dsi,
}

impl RamKind {
    /// Addressing mask mapping an emulated address to a byte offset
    pub const fn mask(self) -> u32 {
        match self {
            RamKind::Nds => 0x003F_FFFF,
            RamKind::Dsi => 0x00FF_FFFF,
        }
    }

    /// Size of the backing block in bytes
    pub const fn size(self) -> usize {
        match self {
            RamKind::Nds => 0x0040_0000,
            RamKind::Dsi => 0x0100_0000,
        }
    }

    /// Identify the kind from a mask candidate
    pub fn from_mask(mask: u32) -> Option<Self> {
        match mask {
            m if m == RamKind::Nds.mask() => Some(RamKind::Nds),
            m if m == RamKind::Dsi.mask() => Some(RamKind::Dsi),
            _ => None,
        }
    }
}

/// Location of main RAM inside the host process
///
/// Found once by the scanner and trusted for the rest of the process's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRegion {
    pub base: Address,
    pub kind: RamKind,
}

impl TargetRegion {
    pub fn new(base: Address, kind: RamKind) -> Self {
        TargetRegion { base, kind }
    }

    pub fn mask(&self) -> u32 {
        self.kind.mask()
    }

    pub fn size(&self) -> usize {
        self.kind.size()
    }

    /// Byte offset of an emulated address inside the block
    pub fn offset_of(&self, address: TargetAddress) -> usize {
        (address.wrapping_sub(MAIN_RAM_START) & self.mask()) as usize
    }

    /// Host address backing an emulated address
    pub fn host_address(&self, address: TargetAddress) -> Address {
        self.base.add(self.offset_of(address))
    }
}

impl fmt::Display for TargetRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mask 0x{:08X})", self.base, self.mask())
    }
}

/// Emulated-address view of main RAM through a fault-isolated accessor
pub struct MainRam<'a, A: FaultIsolatedAccess + ?Sized> {
    region: TargetRegion,
    access: &'a A,
}

impl<'a, A: FaultIsolatedAccess + ?Sized> MainRam<'a, A> {
    pub fn new(region: TargetRegion, access: &'a A) -> Self {
        MainRam { region, access }
    }

    pub fn region(&self) -> TargetRegion {
        self.region
    }

    /// Read a value at an emulated address
    pub fn read(&self, address: TargetAddress, width: Width) -> MemoryResult<u32> {
        self.access.read(self.region.host_address(address), width)
    }

    /// Write a value at an emulated address
    pub fn write(&self, address: TargetAddress, width: Width, value: u32) -> MemoryResult<()> {
        self.access
            .write(self.region.host_address(address), width, value)
    }

    /// Hex dump of `len` bytes at an emulated address; unreadable bytes show as `??`
    pub fn dump(&self, address: TargetAddress, len: usize) -> String {
        let host = self.region.host_address(address);
        let mut buffer = vec![0u8; len];
        if self.access.read_raw(host, &mut buffer).is_ok() {
            return spaced(&hex::encode_upper(&buffer));
        }

        (0..len)
            .map(|i| {
                self.access
                    .read(host.add(i), Width::Byte)
                    .map(|byte| hex::encode_upper([byte as u8]))
                    .unwrap_or_else(|_| "??".to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn spaced(hex: &str) -> String {
    hex.as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).unwrap_or("??"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<A: FaultIsolatedAccess + ?Sized> ValueProvider for MainRam<'_, A> {
    fn read_value(&self, address: TargetAddress, width: Width) -> MemoryResult<u32> {
        self.read(address, width)
    }
}
