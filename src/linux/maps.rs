//! `/proc/<pid>/maps` parsing

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::regions::{Protection, RegionInfo, RegionState, RegionType};
use tracing::trace;

const SELF_MAPS: &str = "/proc/self/maps";

/// Regions of the current process, in ascending address order
pub fn read_self_maps() -> MemoryResult<Vec<RegionInfo>> {
    let text = std::fs::read_to_string(SELF_MAPS)
        .map_err(|e| MemoryError::QueryFailed(format!("Failed to read {}: {}", SELF_MAPS, e)))?;
    Ok(parse_maps(&text))
}

/// Parse a maps listing; malformed lines are skipped
///
/// Format: `start-end perms offset dev inode [pathname]`
pub fn parse_maps(text: &str) -> Vec<RegionInfo> {
    let mut regions: Vec<RegionInfo> = text.lines().filter_map(parse_line).collect();
    regions.sort_by_key(|region| region.base_address);
    regions
}

fn parse_line(line: &str) -> Option<RegionInfo> {
    let mut parts = line.split_whitespace();
    let range = parts.next()?;
    let perms = parts.next()?.as_bytes();
    // offset, device, inode
    let pathname = parts.nth(3).unwrap_or("");

    let (start, end) = range.split_once('-')?;
    let start = usize::from_str_radix(start, 16).ok()?;
    let end = usize::from_str_radix(end, 16).ok()?;
    if end <= start || perms.len() < 4 {
        trace!("Skipping maps line: {}", line);
        return None;
    }

    let private = perms[3] == b'p';
    let protection = Protection {
        readable: perms[0] == b'r',
        writable: perms[1] == b'w',
        executable: perms[2] == b'x',
        copy_on_write: false,
        modified: false,
    };

    let anonymous = pathname.is_empty() || pathname.starts_with('[');
    let region_type = match (anonymous, private) {
        (true, true) => RegionType::Private,
        (false, _) if protection.executable => RegionType::Image,
        _ => RegionType::Mapped,
    };

    Some(RegionInfo {
        base_address: Address::new(start),
        size: end - start,
        state: RegionState::Committed,
        region_type,
        protection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
55d0c0a00000-55d0c0a21000 rw-p 00000000 00:00 0                          [heap]
7f0000000000-7f0000400000 rw-p 00000000 00:00 0 
7f1234567000-7f1234568000 r-xp 00000000 08:01 123456                     /usr/lib/libc.so.6
7f1234568000-7f1234569000 rw-s 00000000 00:05 77                         /dev/shm/x
garbage line
7ffd00000000-7ffd00021000 rw-p 00000000 00:00 0                          [stack]
";

    #[test]
    fn test_parse_maps() {
        let regions = parse_maps(SAMPLE);
        assert_eq!(regions.len(), 5);

        let heap = &regions[0];
        assert_eq!(heap.base_address, Address::new(0x55d0_c0a0_0000));
        assert_eq!(heap.size, 0x21000);
        assert_eq!(heap.region_type, RegionType::Private);
        assert!(heap.protection.is_plain_read_write());

        let anonymous = &regions[1];
        assert_eq!(anonymous.size, 4 * 1024 * 1024);
        assert_eq!(anonymous.region_type, RegionType::Private);

        let libc = &regions[2];
        assert_eq!(libc.region_type, RegionType::Image);
        assert!(!libc.protection.writable);

        let shared = &regions[3];
        assert_eq!(shared.region_type, RegionType::Mapped);
    }

    #[test]
    fn test_read_self_maps_lists_a_known_address() {
        let regions = read_self_maps().unwrap();
        let block = Box::new(0u64);
        let address = Address::from(&*block as *const u64);
        assert!(regions.iter().any(|region| region.contains(address)));
    }
}
