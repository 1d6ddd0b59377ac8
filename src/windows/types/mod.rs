//! Windows-specific type definitions and wrappers

pub mod memory_info;

pub use memory_info::MemoryBasicInfo;
