//! Main RAM acquisition by heap scanning
//!
//! The emulator keeps a pointer to its main RAM block immediately followed by
//! the block's addressing mask. The scanner walks every heap-shaped region of
//! the host looking for that `(pointer, mask)` pair and validates that the
//! pointer lands inside a committed region large enough for the mask.

use crate::core::types::{Address, MemoryResult};
use crate::memory::regions::{FilterCriteria, RegionFilter, RegionInfo};
use crate::memory::target::{RamKind, TargetRegion};
use crate::memory::HostMemory;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

/// Addressing mask of 4 MiB main RAM
pub const NDS_MAIN_RAM_MASK: u32 = RamKind::Nds.mask();

/// Addressing mask of 16 MiB main RAM
pub const DSI_MAIN_RAM_MASK: u32 = RamKind::Dsi.mask();

const STRIDE: usize = 8;
/// Bytes kept clear at the end of a region; also the overlap between chunks
const TAIL: usize = 16;
const POINTER_SIZE: usize = std::mem::size_of::<usize>();
const MASK_SIZE: usize = 4;

/// Options for a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Smallest region worth scanning
    pub min_region_size: usize,
    /// Bytes fetched per read inside a region
    pub chunk_size: usize,
    /// Worker threads; 1 scans on the calling thread
    pub threads: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            min_region_size: 1024 * 1024,
            chunk_size: 64 * 1024,
            threads: num_cpus::get().min(8),
        }
    }
}

/// Locates main RAM inside a host address space
pub struct MainRamScanner<'a, H: HostMemory + ?Sized> {
    host: &'a H,
    options: ScanOptions,
}

impl<'a, H: HostMemory + ?Sized> MainRamScanner<'a, H> {
    /// Create a scanner with default options
    pub fn new(host: &'a H) -> Self {
        Self::with_options(host, ScanOptions::default())
    }

    /// Create a scanner with explicit options
    pub fn with_options(host: &'a H, mut options: ScanOptions) -> Self {
        // Chunks must start on a window boundary
        options.chunk_size = options.chunk_size.max(STRIDE).next_multiple_of(STRIDE);
        options.threads = options.threads.max(1);
        MainRamScanner { host, options }
    }

    /// Regions that qualify for scanning, in ascending base order
    pub fn candidate_regions(&self) -> MemoryResult<Vec<RegionInfo>> {
        let regions = self.host.regions()?;
        let filter = RegionFilter::new(FilterCriteria::heap_candidates(
            self.options.min_region_size,
        ));
        Ok(filter.apply(&regions))
    }

    /// Run one scan. A miss is `Ok(None)`.
    ///
    /// Regions may be examined concurrently, but the match reported is always
    /// the first one in scan order.
    pub fn scan(&self) -> MemoryResult<Option<TargetRegion>> {
        let candidates = self.candidate_regions()?;
        debug!(
            "Scanning {} candidate regions on {} threads",
            candidates.len(),
            self.options.threads
        );

        if self.options.threads == 1 || candidates.len() < 2 {
            return Ok(candidates.iter().find_map(|region| self.scan_region(region)));
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .thread_name(|index| format!("mainram-scan-{}", index))
            .build()
        {
            Ok(pool) => Ok(pool.install(|| {
                candidates
                    .par_iter()
                    .find_map_first(|region| self.scan_region(region))
            })),
            Err(e) => {
                warn!("Scan pool unavailable, scanning sequentially: {}", e);
                Ok(candidates.iter().find_map(|region| self.scan_region(region)))
            }
        }
    }

    /// Scan a single region, chunk by chunk
    pub fn scan_region(&self, region: &RegionInfo) -> Option<TargetRegion> {
        if region.size <= TAIL {
            return None;
        }
        trace!("Scanning region {} ({} bytes)", region.base_address, region.size);

        let limit = region.size - TAIL;
        let mut buffer = Vec::with_capacity(self.options.chunk_size + TAIL);
        let mut chunk_start = 0;

        while chunk_start < limit {
            let windows_end = (chunk_start + self.options.chunk_size).min(limit);
            let read_len = (windows_end - chunk_start + TAIL).min(region.size - chunk_start);
            let chunk_base = region.base_address.add(chunk_start);

            buffer.clear();
            buffer.resize(read_len, 0);

            let found = match self.host.read_raw(chunk_base, &mut buffer) {
                Ok(()) => (chunk_start..windows_end)
                    .step_by(STRIDE)
                    .find_map(|offset| self.check_buffered(&buffer[offset - chunk_start..])),
                Err(e) => {
                    trace!("Chunk at {} faulted ({}), checking windows", chunk_base, e);
                    (chunk_start..windows_end)
                        .step_by(STRIDE)
                        .find_map(|offset| self.check_window(region.base_address.add(offset)))
                }
            };

            if found.is_some() {
                return found;
            }
            chunk_start = windows_end;
        }

        None
    }

    /// Examine the window at `address` with individual reads
    pub fn check_window(&self, address: Address) -> Option<TargetRegion> {
        let pointer = self.host.read_pointer(address).ok()?;
        let mut mask = [0u8; MASK_SIZE];
        self.host
            .read_raw(address.add(POINTER_SIZE), &mut mask)
            .ok()?;
        self.validate(pointer, u32::from_le_bytes(mask))
    }

    fn check_buffered(&self, window: &[u8]) -> Option<TargetRegion> {
        let pointer = usize::from_le_bytes(window[..POINTER_SIZE].try_into().ok()?);
        let mask = u32::from_le_bytes(
            window[POINTER_SIZE..POINTER_SIZE + MASK_SIZE]
                .try_into()
                .ok()?,
        );
        self.validate(Address::new(pointer), mask)
    }

    fn validate(&self, pointer: Address, mask: u32) -> Option<TargetRegion> {
        if pointer.is_null() {
            return None;
        }
        let kind = RamKind::from_mask(mask)?;
        let backing = self.host.query(pointer).ok()?;

        if !backing.is_committed() || backing.remaining_from(pointer) < kind.size() {
            trace!(
                "Rejected {} with mask 0x{:08X}: backing region too small",
                pointer,
                mask
            );
            return None;
        }

        Some(TargetRegion::new(pointer, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SyntheticMemory;

    const HEAP: usize = 0x1000_0000;
    const RAM: usize = 0x4000_0000;
    const MIB: usize = 1024 * 1024;

    fn plant(memory: &SyntheticMemory, at: usize, pointer: usize, mask: u32) {
        memory
            .poke(Address::new(at), &pointer.to_le_bytes())
            .unwrap();
        memory
            .poke(Address::new(at + 8), &mask.to_le_bytes())
            .unwrap();
    }

    fn sequential() -> ScanOptions {
        ScanOptions {
            threads: 1,
            ..ScanOptions::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.min_region_size, MIB);
        assert_eq!(options.chunk_size, 64 * 1024);
        assert!(options.threads >= 1 && options.threads <= 8);
    }

    #[test]
    fn test_finds_nds_main_ram() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        plant(&memory, HEAP + 0x40, RAM, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap()
            .unwrap();
        assert_eq!(found.base, Address::new(RAM));
        assert_eq!(found.kind, RamKind::Nds);
    }

    #[test]
    fn test_finds_dsi_main_ram() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 16 * MIB);
        plant(&memory, HEAP + 0x2_0000, RAM, DSI_MAIN_RAM_MASK);

        let found = MainRamScanner::new(&memory).scan().unwrap().unwrap();
        assert_eq!(found.kind, RamKind::Dsi);
        assert_eq!(found.mask(), 0x00FF_FFFF);
    }

    #[test]
    fn test_rejects_undersized_backing_and_continues() {
        let small = 0x3000_0000;
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(small), 2 * MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        plant(&memory, HEAP + 0x10, small, NDS_MAIN_RAM_MASK);
        plant(&memory, HEAP + 0x80, RAM, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap()
            .unwrap();
        assert_eq!(found.base, Address::new(RAM));
    }

    #[test]
    fn test_pointer_near_region_end_is_rejected() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        plant(&memory, HEAP, RAM + 0x100, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_ignores_unknown_masks_and_null_pointers() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        plant(&memory, HEAP + 0x100, RAM, 0x001F_FFFF);
        plant(&memory, HEAP + 0x200, 0, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::new(&memory).scan().unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_small_regions_are_not_scanned() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), 512 * 1024)
            .with_region(Address::new(RAM), 4 * MIB);
        plant(&memory, HEAP + 0x40, RAM, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_windows_in_the_tail_are_skipped() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        // offset size - 16 is the first window not examined
        plant(&memory, HEAP + MIB - 16, RAM, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap();
        assert!(found.is_none());

        plant(&memory, HEAP + MIB - 24, RAM, NDS_MAIN_RAM_MASK);
        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_structure_straddling_chunks() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB);
        // pointer ends the first chunk, mask begins the second
        plant(&memory, HEAP + 64 * 1024 - 8, RAM, NDS_MAIN_RAM_MASK);

        let found = MainRamScanner::with_options(&memory, sequential())
            .scan()
            .unwrap();
        assert_eq!(found.map(|t| t.base), Some(Address::new(RAM)));
    }

    #[test]
    fn test_faulting_chunk_falls_back_to_windows() {
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(RAM), 4 * MIB)
            .with_fault(Address::new(HEAP + 0x100), 0x20);
        plant(&memory, HEAP + 0x400, RAM, NDS_MAIN_RAM_MASK);

        let scanner = MainRamScanner::with_options(&memory, sequential());
        assert!(scanner.check_window(Address::new(HEAP + 0x100)).is_none());
        let found = scanner.scan().unwrap().unwrap();
        assert_eq!(found.base, Address::new(RAM));
    }

    #[test]
    fn test_parallel_scan_reports_first_in_order() {
        let second_heap = 0x2000_0000;
        let other_ram = 0x6000_0000;
        let memory = SyntheticMemory::new()
            .with_region(Address::new(HEAP), MIB)
            .with_region(Address::new(second_heap), MIB)
            .with_region(Address::new(RAM), 4 * MIB)
            .with_region(Address::new(other_ram), 4 * MIB);
        plant(&memory, HEAP + MIB - 32, RAM, NDS_MAIN_RAM_MASK);
        plant(&memory, second_heap, other_ram, NDS_MAIN_RAM_MASK);

        let options = ScanOptions {
            threads: 4,
            ..ScanOptions::default()
        };
        let found = MainRamScanner::with_options(&memory, options)
            .scan()
            .unwrap()
            .unwrap();
        assert_eq!(found.base, Address::new(RAM));
    }
}
