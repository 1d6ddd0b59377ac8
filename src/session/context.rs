//! Shared session state
//!
//! Everything the tasks of one session share: the host, the located main RAM,
//! the registry and the selected variant. Constructed once per session and
//! handed to each task behind an `Arc`.

use crate::core::types::Address;
use crate::memory::{HostMemory, MainRam, TargetRegion};
use crate::registry::{ValueRegistry, VariantCatalog};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::sync::Notify;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingTarget,
    AwaitingVariantSelection,
    Polling,
    /// Every scan attempt missed; commands are still answered
    AcquisitionFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingTarget => "awaiting target",
            SessionState::AwaitingVariantSelection => "awaiting variant selection",
            SessionState::Polling => "polling",
            SessionState::AcquisitionFailed => "acquisition failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a variant selection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The registry was populated with `count` values
    Selected { tag: String, count: usize },
    /// A variant was chosen earlier; nothing changed
    AlreadySelected { current: String },
    /// No table carries this tag
    Unknown,
}

/// State shared by the tasks of one session
pub struct SessionContext {
    host: Arc<dyn HostMemory>,
    catalog: VariantCatalog,
    target: OnceLock<TargetRegion>,
    acquisition_failed: AtomicBool,
    registry: Mutex<ValueRegistry>,
    variant: OnceLock<String>,
    ready: Notify,
}

impl SessionContext {
    pub fn new(host: Arc<dyn HostMemory>, catalog: VariantCatalog) -> Self {
        SessionContext {
            host,
            catalog,
            target: OnceLock::new(),
            acquisition_failed: AtomicBool::new(false),
            registry: Mutex::new(ValueRegistry::new()),
            variant: OnceLock::new(),
            ready: Notify::new(),
        }
    }

    pub fn host(&self) -> Arc<dyn HostMemory> {
        Arc::clone(&self.host)
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    pub fn state(&self) -> SessionState {
        match (self.target.get(), self.variant.get()) {
            (Some(_), Some(_)) => SessionState::Polling,
            (Some(_), None) => SessionState::AwaitingVariantSelection,
            (None, _) if self.acquisition_failed.load(Ordering::Acquire) => {
                SessionState::AcquisitionFailed
            }
            (None, _) => SessionState::AwaitingTarget,
        }
    }

    pub fn target(&self) -> Option<TargetRegion> {
        self.target.get().copied()
    }

    /// Host base of main RAM, once located
    pub fn target_base(&self) -> Option<Address> {
        self.target().map(|region| region.base)
    }

    /// Record the located main RAM. Only the first call has an effect.
    pub fn set_target(&self, region: TargetRegion) -> bool {
        let stored = self.target.set(region).is_ok();
        if stored {
            self.ready.notify_one();
        }
        stored
    }

    pub fn mark_acquisition_failed(&self) {
        self.acquisition_failed.store(true, Ordering::Release);
    }

    /// Main RAM view over the host, once located
    pub fn main_ram(&self) -> Option<MainRam<'_, dyn HostMemory>> {
        self.target
            .get()
            .map(|region| MainRam::new(*region, self.host.as_ref()))
    }

    /// Lock the registry. Never hold the guard across an `.await`.
    pub fn registry(&self) -> MutexGuard<'_, ValueRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.get().map(String::as_str)
    }

    /// Populate the registry from the table tagged `tag`, at most once per session
    pub fn select_variant(&self, tag: &str) -> Selection {
        let mut registry = self.registry();

        if let Some(current) = self.variant.get() {
            return Selection::AlreadySelected {
                current: current.clone(),
            };
        }
        let Some(table) = self.catalog.get(tag) else {
            return Selection::Unknown;
        };

        registry.populate(table);
        let _ = self.variant.set(table.tag.clone());
        let count = registry.len();
        drop(registry);

        self.ready.notify_one();
        Selection::Selected {
            tag: table.tag.clone(),
            count,
        }
    }

    /// Whether main RAM is located and the registry populated
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Polling
    }

    /// Resolve once polling can start
    pub async fn wait_ready(&self) {
        while !self.is_ready() {
            self.ready.notified().await;
        }
    }
}
