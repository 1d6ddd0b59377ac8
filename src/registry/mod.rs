//! Named values tracked inside main RAM
//!
//! The registry holds an ordered set of [`TrackedValue`]s, refreshes them from
//! a [`ValueProvider`] and remembers which ones changed since the last
//! message was built. The address sets it is populated from live in
//! [`variants`].

pub mod tracker;
pub mod variants;

pub use tracker::{TrackedValue, ValueProvider, ValueRegistry};
pub use variants::{AddressEntry, AddressTable, VariantCatalog};
