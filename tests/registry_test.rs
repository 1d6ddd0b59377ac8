//! Change tracking and message building over the registry

use mainram_bridge::protocol::{OutboundMessage, Snapshot};
use mainram_bridge::registry::{AddressTable, ValueRegistry, VariantCatalog};
use mainram_bridge::{MemoryResult, Width};
use proptest::prelude::*;
use std::collections::HashMap;

fn reader(values: &HashMap<u32, u32>) -> impl Fn(u32, Width) -> MemoryResult<u32> + '_ {
    move |address, width| Ok(values.get(&address).copied().unwrap_or(0) & width.value_mask())
}

#[test]
fn test_builtin_table_populates_registry() {
    let catalog = VariantCatalog::builtin();
    let mut registry = ValueRegistry::new();

    assert!(registry.populate(catalog.get("RJ").unwrap()));
    assert_eq!(registry.len(), 35);
    assert!(!registry.populate(&AddressTable::builtin()));
    assert_eq!(registry.len(), 35);
    assert!(catalog.get("rj").is_none());
}

#[test]
fn test_full_then_delta_cycle() {
    let mut registry = ValueRegistry::new();
    registry.populate(&AddressTable::builtin());

    let mut memory = HashMap::new();
    registry.update(&reader(&memory));
    let full = Snapshot::full(&registry);
    assert_eq!(full.len(), 35);
    registry.reset_change_flags();

    registry.update(&reader(&memory));
    assert!(OutboundMessage::delta(&registry).is_none());

    memory.insert(0x020F_3394, 100_000);
    memory.insert(0x020F_3806, 3);
    registry.update(&reader(&memory));
    let delta = Snapshot::delta(&registry);
    assert_eq!(delta.len(), 2);
    assert_eq!(delta.get("ZENY").unwrap().v, 100_000);
    assert_eq!(delta.get("CARD01").unwrap().v, 3);
    assert!(delta.get("ZENY").unwrap().a.is_none());
}

proptest! {
    #[test]
    fn prop_delta_lists_exactly_the_changed_values(
        before in prop::collection::vec(any::<u32>(), 35),
        after in prop::collection::vec(any::<u32>(), 35),
    ) {
        let table = AddressTable::builtin();
        let mut registry = ValueRegistry::new();
        registry.populate(&table);

        let snapshot = |values: &[u32]| -> HashMap<u32, u32> {
            table
                .entries()
                .iter()
                .zip(values)
                .map(|(entry, value)| (entry.address, value & entry.width.value_mask()))
                .collect()
        };

        let first = snapshot(&before[..]);
        registry.update(&reader(&first));
        registry.reset_change_flags();

        let second = snapshot(&after[..]);
        registry.update(&reader(&second));

        let changed: Vec<&str> = registry.changed().map(|v| v.name.as_str()).collect();
        let expected: Vec<&str> = table
            .entries()
            .iter()
            .filter(|entry| first[&entry.address] != second[&entry.address])
            .map(|entry| entry.name.as_str())
            .collect();
        prop_assert_eq!(changed, expected);

        for value in registry.iter() {
            prop_assert!(value.current <= value.width.value_mask());
        }
    }

    #[test]
    fn prop_reset_acknowledges_everything(values in prop::collection::vec(any::<u32>(), 35)) {
        let table = AddressTable::builtin();
        let mut registry = ValueRegistry::new();
        registry.populate(&table);

        let memory: HashMap<u32, u32> = table
            .entries()
            .iter()
            .zip(&values)
            .map(|(entry, value)| (entry.address, *value))
            .collect();
        registry.update(&reader(&memory));
        registry.reset_change_flags();

        prop_assert!(!registry.has_changes());
        for value in registry.iter() {
            prop_assert_eq!(value.current, value.last_acknowledged);
        }
    }
}
