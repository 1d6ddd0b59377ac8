//! Default configuration values for mainram-bridge

/// Default values for every configuration field
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const ENDPOINT_RETRY_MS: u64 = 1_000;
    pub const STOP_TIMEOUT_MS: u64 = 2_000;

    pub const GRACE_PERIOD_MS: u64 = 15_000;
    pub const SCAN_ATTEMPTS: u32 = 20;
    pub const SCAN_RETRY_MS: u64 = 3_000;
    pub const MIN_REGION_SIZE: usize = 1024 * 1024; // 1MB
    pub const CHUNK_SIZE: usize = 65536; // 64KB
    pub const DUMP_BYTES: usize = 32;

    pub const POLL_INTERVAL_MS: u64 = 50;
    pub const FULL_RESYNC_MS: u64 = 30_000;

    pub const LOG_LEVEL: &'static str = "info";

    /// Scanner worker threads
    pub fn scan_threads() -> usize {
        num_cpus::get().min(8)
    }

    /// Platform endpoint name
    pub fn endpoint() -> String {
        crate::transport::default_endpoint()
    }
}
