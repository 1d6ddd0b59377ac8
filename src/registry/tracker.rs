//! Delta tracking of named values

use crate::core::types::{MemoryResult, TargetAddress, Width};
use crate::registry::variants::AddressTable;
use std::collections::HashMap;

/// Source of current values, addressed in the emulated address space
pub trait ValueProvider {
    fn read_value(&self, address: TargetAddress, width: Width) -> MemoryResult<u32>;
}

impl<F> ValueProvider for F
where
    F: Fn(TargetAddress, Width) -> MemoryResult<u32>,
{
    fn read_value(&self, address: TargetAddress, width: Width) -> MemoryResult<u32> {
        self(address, width)
    }
}

/// A named value bound to an emulated address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedValue {
    pub name: String,
    pub address: TargetAddress,
    pub width: Width,
    /// Last value read
    pub current: u32,
    /// Value at the time of the last reset
    pub last_acknowledged: u32,
    /// Differs from the previous read, or never read before the last update
    pub changed: bool,
    pub has_been_read: bool,
}

impl TrackedValue {
    pub fn new(name: impl Into<String>, address: TargetAddress, width: Width) -> Self {
        TrackedValue {
            name: name.into(),
            address,
            width,
            current: 0,
            last_acknowledged: 0,
            changed: false,
            has_been_read: false,
        }
    }

    /// Record a freshly read value
    fn observe(&mut self, value: u32) {
        if !self.has_been_read || self.current != value {
            self.changed = true;
        }
        self.current = value;
        self.has_been_read = true;
    }
}

/// Ordered collection of tracked values
#[derive(Debug, Default)]
pub struct ValueRegistry {
    values: Vec<TrackedValue>,
    index: HashMap<String, usize>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        ValueRegistry::default()
    }

    /// Append a value. Re-registering a name rebinds it in place.
    pub fn register(&mut self, name: impl Into<String>, address: TargetAddress, width: Width) {
        let value = TrackedValue::new(name, address, width);
        match self.index.get(&value.name) {
            Some(&slot) => self.values[slot] = value,
            None => {
                self.index.insert(value.name.clone(), self.values.len());
                self.values.push(value);
            }
        }
    }

    /// Register every entry of `table` if the registry is still empty.
    ///
    /// Returns `false` and leaves the registry untouched once it holds entries.
    pub fn populate(&mut self, table: &AddressTable) -> bool {
        if !self.values.is_empty() {
            return false;
        }
        for entry in table.entries() {
            self.register(entry.name.clone(), entry.address, entry.width);
        }
        true
    }

    /// Refresh every value. Failed reads leave their entry untouched.
    pub fn update<P: ValueProvider + ?Sized>(&mut self, provider: &P) {
        for value in &mut self.values {
            if let Ok(read) = provider.read_value(value.address, value.width) {
                value.observe(read);
            }
        }
    }

    /// Whether any value changed since the last reset
    pub fn has_changes(&self) -> bool {
        self.values.iter().any(|value| value.changed)
    }

    /// Acknowledge the current state: snapshot values and clear change flags
    pub fn reset_change_flags(&mut self) {
        for value in &mut self.values {
            value.last_acknowledged = value.current;
            value.changed = false;
        }
    }

    /// Exact, case-sensitive lookup
    pub fn find_by_name(&self, name: &str) -> Option<&TrackedValue> {
        self.index.get(name).map(|&slot| &self.values[slot])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TrackedValue> {
        self.values.iter()
    }

    /// Values read at least once, in registration order
    pub fn initialized(&self) -> impl Iterator<Item = &TrackedValue> {
        self.values.iter().filter(|value| value.has_been_read)
    }

    /// Values flagged as changed, in registration order
    pub fn changed(&self) -> impl Iterator<Item = &TrackedValue> {
        self.values.iter().filter(|value| value.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MemoryError;
    use crate::registry::AddressEntry;

    fn constant(value: u32) -> impl Fn(u32, Width) -> MemoryResult<u32> {
        move |_address, _width| Ok(value)
    }

    fn registry() -> ValueRegistry {
        let mut registry = ValueRegistry::new();
        registry.register("ZENY", 0x020F_3394, Width::Word);
        registry.register("NOISE", 0x020F_39C0, Width::Byte);
        registry
    }

    #[test]
    fn test_first_update_marks_everything_changed() {
        let mut registry = registry();
        assert!(!registry.has_changes());

        registry.update(&constant(0));
        assert!(registry.has_changes());
        assert_eq!(registry.changed().count(), 2);
    }

    #[test]
    fn test_unchanged_values_stay_clean() {
        let mut registry = registry();
        registry.update(&constant(5));
        registry.reset_change_flags();

        registry.update(&constant(5));
        assert!(!registry.has_changes());

        registry.update(&|address: u32, _width: Width| -> MemoryResult<u32> {
            Ok(if address == 0x020F_3394 { 6 } else { 5 })
        });
        let changed: Vec<_> = registry.changed().map(|v| v.name.as_str()).collect();
        assert_eq!(changed, vec!["ZENY"]);
    }

    #[test]
    fn test_failed_reads_leave_entries_untouched() {
        let mut registry = registry();
        registry.update(&|address: u32, _width: Width| -> MemoryResult<u32> {
            if address == 0x020F_39C0 {
                Err(MemoryError::read_failed(crate::Address::new(0), "fault"))
            } else {
                Ok(10)
            }
        });

        let noise = registry.find_by_name("NOISE").unwrap();
        assert!(!noise.has_been_read);
        assert!(!noise.changed);
        assert_eq!(registry.initialized().count(), 1);
    }

    #[test]
    fn test_reset_snapshots_acknowledged_values() {
        let mut registry = registry();
        registry.update(&constant(42));
        registry.reset_change_flags();

        let zeny = registry.find_by_name("ZENY").unwrap();
        assert_eq!(zeny.last_acknowledged, 42);
        assert!(!zeny.changed);
    }

    #[test]
    fn test_populate_is_write_once() {
        let first = AddressTable::new(
            "RJ",
            vec![AddressEntry::new("ZENY", 0x020F_3394, Width::Word)],
        );
        let second = AddressTable::new(
            "BA",
            vec![AddressEntry::new("OTHER", 0x0200_0000, Width::Byte)],
        );

        let mut registry = ValueRegistry::new();
        assert!(registry.populate(&first));
        assert!(!registry.populate(&second));
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_name("OTHER").is_none());
    }

    #[test]
    fn test_find_by_name_is_case_sensitive() {
        let registry = registry();
        assert!(registry.find_by_name("ZENY").is_some());
        assert!(registry.find_by_name("zeny").is_none());
    }

    #[test]
    fn test_register_keeps_order_and_rebinds_duplicates() {
        let mut registry = registry();
        registry.register("ZENY", 0x020F_0000, Width::Half);

        let names: Vec<_> = registry.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ZENY", "NOISE"]);
        assert_eq!(registry.find_by_name("ZENY").unwrap().width, Width::Half);
    }
}
