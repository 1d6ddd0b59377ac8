//! Main RAM acquisition against synthetic address spaces

use mainram_bridge::memory::{
    MainRam, MainRamScanner, Protection, RamKind, RegionInfo, RegionType, ScanOptions,
    SyntheticMemory, DSI_MAIN_RAM_MASK, NDS_MAIN_RAM_MASK,
};
use mainram_bridge::{Address, Width};

const MIB: usize = 1024 * 1024;
const RAM: usize = 0x7000_0000;

fn plant(memory: &SyntheticMemory, at: usize, pointer: usize, mask: u32) {
    memory.poke(Address::new(at), &pointer.to_le_bytes()).unwrap();
    memory.poke(Address::new(at + 8), &mask.to_le_bytes()).unwrap();
}

fn region(base: usize, size: usize) -> RegionInfo {
    RegionInfo::private_read_write(Address::new(base), size)
}

fn parallel() -> ScanOptions {
    ScanOptions {
        threads: 4,
        chunk_size: 4096,
        ..ScanOptions::default()
    }
}

/// A busy heap: several candidate regions, most of them noise
fn crowded_host() -> SyntheticMemory {
    let memory = SyntheticMemory::new().with_region(Address::new(RAM), 4 * MIB);
    for i in 0..8 {
        memory.map(region(0x1000_0000 + i * 0x0100_0000, 2 * MIB));
    }
    memory
}

#[test]
fn test_parallel_scan_finds_structure_in_late_region() {
    let memory = crowded_host();
    plant(&memory, 0x1700_0000 + 0x1_2340, RAM, NDS_MAIN_RAM_MASK);

    let found = MainRamScanner::with_options(&memory, parallel())
        .scan()
        .unwrap()
        .unwrap();
    assert_eq!(found.base, Address::new(RAM));
    assert_eq!(found.kind, RamKind::Nds);
}

#[test]
fn test_lowest_region_wins_when_several_match() {
    let memory = crowded_host().with_region(Address::new(0x6000_0000), 4 * MIB);
    plant(&memory, 0x1600_0000 + 0x80, RAM, NDS_MAIN_RAM_MASK);
    plant(&memory, 0x1200_0000 + 0x80, 0x6000_0000, NDS_MAIN_RAM_MASK);

    let found = MainRamScanner::with_options(&memory, parallel())
        .scan()
        .unwrap()
        .unwrap();
    assert_eq!(found.base, Address::new(0x6000_0000));
}

#[test]
fn test_structures_outside_plain_private_heap_are_ignored() {
    let read_only = RegionInfo {
        protection: Protection::READ_ONLY,
        ..region(0x2000_0000, 2 * MIB)
    };
    let mapped = RegionInfo {
        region_type: RegionType::Mapped,
        ..region(0x2100_0000, 2 * MIB)
    };
    let guarded = RegionInfo {
        protection: Protection {
            modified: true,
            ..Protection::READ_WRITE
        },
        ..region(0x2200_0000, 2 * MIB)
    };
    let memory = SyntheticMemory::new()
        .with_region(Address::new(RAM), 16 * MIB)
        .with_region_info(read_only)
        .with_region_info(mapped)
        .with_region_info(guarded);
    for base in [0x2000_0000, 0x2100_0000, 0x2200_0000] {
        plant(&memory, base + 0x40, RAM, DSI_MAIN_RAM_MASK);
    }

    let found = MainRamScanner::new(&memory).scan().unwrap();
    assert!(found.is_none());
}

#[test]
fn test_executable_heap_is_scanned() {
    let rwx = RegionInfo {
        protection: Protection::READ_WRITE_EXECUTE,
        ..region(0x2000_0000, 2 * MIB)
    };
    let memory = SyntheticMemory::new()
        .with_region(Address::new(RAM), 16 * MIB)
        .with_region_info(rwx);
    plant(&memory, 0x2000_0000 + 0x40, RAM, DSI_MAIN_RAM_MASK);

    let found = MainRamScanner::new(&memory).scan().unwrap().unwrap();
    assert_eq!(found.kind, RamKind::Dsi);
}

#[test]
fn test_faulting_pages_do_not_stop_the_scan() {
    let memory = SyntheticMemory::new()
        .with_region(Address::new(0x1000_0000), 2 * MIB)
        .with_region(Address::new(RAM), 4 * MIB)
        .with_fault(Address::new(0x1000_0000), 0x1000)
        .with_fault(Address::new(0x1004_0000), 0x8000);
    plant(&memory, 0x1004_8000 + 0x10, RAM, NDS_MAIN_RAM_MASK);

    let found = MainRamScanner::with_options(&memory, parallel())
        .scan()
        .unwrap()
        .unwrap();
    assert_eq!(found.base, Address::new(RAM));
}

#[test]
fn test_located_ram_is_usable() {
    let memory = crowded_host();
    plant(&memory, 0x1000_0000, RAM, NDS_MAIN_RAM_MASK);
    let found = MainRamScanner::new(&memory).scan().unwrap().unwrap();

    let ram = MainRam::new(found, &memory);
    ram.write(0x0200_0000, Width::Word, 0x0403_0201).unwrap();
    assert_eq!(ram.dump(0x0200_0000, 4), "01 02 03 04");
    assert_eq!(ram.read(0x020F_3394, Width::Word).unwrap(), 0);
}

#[test]
fn test_dump_marks_unreadable_bytes() {
    let memory = SyntheticMemory::new()
        .with_region(Address::new(RAM), 4 * MIB)
        .with_fault(Address::new(RAM + 2), 1);
    memory.poke(Address::new(RAM), &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();

    let ram = MainRam::new(
        mainram_bridge::memory::TargetRegion::new(Address::new(RAM), RamKind::Nds),
        &memory,
    );
    assert_eq!(ram.dump(0x0200_0000, 4), "AA BB ?? DD");
}
