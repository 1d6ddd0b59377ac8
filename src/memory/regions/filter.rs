//! Memory region filtering functionality

use crate::memory::regions::{RegionInfo, RegionState, RegionType};

/// Criteria for filtering memory regions
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Filter by minimum size
    pub min_size: Option<usize>,
    /// Filter by state
    pub state: Option<RegionState>,
    /// Filter by type
    pub region_type: Option<RegionType>,
    /// Only exactly read-write / read-write-execute regions
    pub plain_read_write_only: bool,
}

impl FilterCriteria {
    /// Create a new filter criteria builder
    pub fn new() -> Self {
        FilterCriteria::default()
    }

    /// Regions that may host the emulator's core structure: committed,
    /// private, plain read-write and at least `min_size` bytes
    pub fn heap_candidates(min_size: usize) -> Self {
        FilterCriteria::new()
            .with_state(RegionState::Committed)
            .with_type(RegionType::Private)
            .plain_read_write()
            .with_min_size(min_size)
    }

    /// Set minimum size filter
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }

    /// Set state filter
    pub fn with_state(mut self, state: RegionState) -> Self {
        self.state = Some(state);
        self
    }

    /// Set type filter
    pub fn with_type(mut self, region_type: RegionType) -> Self {
        self.region_type = Some(region_type);
        self
    }

    /// Filter for plain read-write regions only
    pub fn plain_read_write(mut self) -> Self {
        self.plain_read_write_only = true;
        self
    }
}

/// Filter for memory regions
pub struct RegionFilter {
    criteria: FilterCriteria,
}

impl RegionFilter {
    /// Create a new region filter with the given criteria
    pub fn new(criteria: FilterCriteria) -> Self {
        RegionFilter { criteria }
    }

    /// Apply the filter, keeping matches sorted by ascending base address
    pub fn apply(&self, regions: &[RegionInfo]) -> Vec<RegionInfo> {
        let mut matched: Vec<RegionInfo> = regions
            .iter()
            .filter(|region| self.matches(region))
            .cloned()
            .collect();
        matched.sort_by_key(|region| region.base_address);
        matched
    }

    /// Check if a region matches the filter criteria
    pub fn matches(&self, region: &RegionInfo) -> bool {
        if let Some(min_size) = self.criteria.min_size {
            if region.size < min_size {
                return false;
            }
        }

        if let Some(state) = self.criteria.state {
            if region.state != state {
                return false;
            }
        }

        if let Some(region_type) = self.criteria.region_type {
            if region.region_type != region_type {
                return false;
            }
        }

        if self.criteria.plain_read_write_only && !region.protection.is_plain_read_write() {
            return false;
        }

        true
    }
}
