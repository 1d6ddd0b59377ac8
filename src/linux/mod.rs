//! Linux host layer
//!
//! Cross-memory syscalls against our own pid give fault-isolated access:
//! an unmapped or protected range fails with `EFAULT` instead of raising
//! `SIGSEGV`. Regions come from `/proc/self/maps`.

pub mod maps;
pub mod vm;

pub use maps::{parse_maps, read_self_maps};
pub use vm::{read_memory, write_memory};
