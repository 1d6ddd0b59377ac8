//! The host process this bridge runs inside
//!
//! [`HostProcess`] is the production implementation of the memory
//! capabilities: fault-isolated access and region queries against the
//! current process, backed by the platform layer.

pub mod handle;

pub use handle::HostProcess;
