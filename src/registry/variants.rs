//! Address tables for the supported game variants

use crate::core::types::{TargetAddress, Width};
use serde::{Deserialize, Serialize};

/// Tag of the built-in table
pub const BUILTIN_TAG: &str = "RJ";

/// One named value of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub name: String,
    pub address: TargetAddress,
    pub width: Width,
}

impl AddressEntry {
    pub fn new(name: impl Into<String>, address: TargetAddress, width: Width) -> Self {
        AddressEntry {
            name: name.into(),
            address,
            width,
        }
    }
}

/// Immutable named list of addresses for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTable {
    pub tag: String,
    #[serde(default)]
    pub entries: Vec<AddressEntry>,
}

impl AddressTable {
    pub fn new(tag: impl Into<String>, entries: Vec<AddressEntry>) -> Self {
        AddressTable {
            tag: tag.into(),
            entries,
        }
    }

    /// The table shipped with the bridge
    pub fn builtin() -> Self {
        let mut entries = vec![
            AddressEntry::new("ZENY", 0x020F_3394, Width::Word),
            AddressEntry::new("NOISE", 0x020F_39C0, Width::Byte),
            AddressEntry::new("WARLOCK", 0x020F_2CD0, Width::Word),
        ];
        entries.extend((0..30u32).map(|i| {
            AddressEntry::new(format!("CARD{:02}", i + 1), 0x020F_3806 + 2 * i, Width::Half)
        }));
        entries.push(AddressEntry::new("REG", 0x020F_3844, Width::Half));
        entries.push(AddressEntry::new("TAG1_2", 0x020F_3842, Width::Half));

        AddressTable::new(BUILTIN_TAG, entries)
    }

    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every table a client may select from
#[derive(Debug, Clone)]
pub struct VariantCatalog {
    tables: Vec<AddressTable>,
}

impl VariantCatalog {
    /// Catalog holding only the built-in table
    pub fn builtin() -> Self {
        VariantCatalog {
            tables: vec![AddressTable::builtin()],
        }
    }

    /// Built-in tables plus configured ones; a configured tag replaces a built-in one
    pub fn with_tables(tables: impl IntoIterator<Item = AddressTable>) -> Self {
        let mut catalog = Self::builtin();
        for table in tables {
            match catalog.tables.iter_mut().find(|t| t.tag == table.tag) {
                Some(existing) => *existing = table,
                None => catalog.tables.push(table),
            }
        }
        catalog
    }

    pub fn get(&self, tag: &str) -> Option<&AddressTable> {
        self.tables.iter().find(|table| table.tag == tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.tag.as_str())
    }
}

impl Default for VariantCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
