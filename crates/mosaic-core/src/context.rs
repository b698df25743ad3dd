//! Process context
//!
//! One [`Context`] is created by the host application and shared (cheaply
//! cloned) by every image it makes.  It owns the state that must be process
//! wide:
//!
//! - resource limits and in-use counters consulted when a pixel cache is
//!   first sized ([`Context::acquire_resource`]);
//! - the codec lock serialising coders that are not thread-safe
//!   ([`Context::codec_lock`]);
//! - the optional progress monitor polled once per row by long operations.
//!
//! Changing a limit affects caches opened afterwards only.

use parking_lot::{Mutex, MutexGuard, RwLock};
use std::fmt;
use std::sync::Arc;

/// Resource classes with a configurable limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Pixels held by caches (columns x rows)
    Area,
    /// Bytes of heap pixel storage
    Memory,
    /// Bytes of disk paging files
    Disk,
    /// Open paging files
    File,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Area,
        ResourceType::Memory,
        ResourceType::Disk,
        ResourceType::File,
    ];

    fn env_var(self) -> &'static str {
        match self {
            ResourceType::Area => "MOSAIC_AREA_LIMIT",
            ResourceType::Memory => "MOSAIC_MEMORY_LIMIT",
            ResourceType::Disk => "MOSAIC_DISK_LIMIT",
            ResourceType::File => "MOSAIC_FILE_LIMIT",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Area => "area",
            ResourceType::Memory => "memory",
            ResourceType::Disk => "disk",
            ResourceType::File => "file",
        };
        f.write_str(name)
    }
}

/// Resource limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub area: Option<u64>,
    pub memory: Option<u64>,
    pub disk: Option<u64>,
    pub file: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            area: None,
            memory: Some(1 << 30),
            disk: None,
            file: Some(768),
        }
    }
}

impl ResourceLimits {
    /// No limits at all
    pub fn unlimited() -> Self {
        Self {
            area: None,
            memory: None,
            disk: None,
            file: None,
        }
    }

    /// Defaults overridden by `MOSAIC_*_LIMIT` environment variables.
    ///
    /// Values are byte or item counts with an optional binary suffix
    /// (`K`, `M`, `G`, `T`); `unlimited` removes the limit.  Unparsable
    /// values are ignored.
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        for kind in ResourceType::ALL {
            let Ok(text) = std::env::var(kind.env_var()) else {
                continue;
            };
            match parse_limit(&text) {
                Some(limit) => limits.set(kind, limit),
                None => log::warn!("ignoring {}={text:?}: not a size", kind.env_var()),
            }
        }
        limits
    }

    /// Limit for one resource
    pub fn get(&self, kind: ResourceType) -> Option<u64> {
        match kind {
            ResourceType::Area => self.area,
            ResourceType::Memory => self.memory,
            ResourceType::Disk => self.disk,
            ResourceType::File => self.file,
        }
    }

    /// Set the limit for one resource
    pub fn set(&mut self, kind: ResourceType, limit: Option<u64>) {
        match kind {
            ResourceType::Area => self.area = limit,
            ResourceType::Memory => self.memory = limit,
            ResourceType::Disk => self.disk = limit,
            ResourceType::File => self.file = limit,
        }
    }
}

/// Parse `"512"`, `"64M"`, `"2GiB"`, `"unlimited"`.
///
/// Returns `Some(None)` for unlimited and `None` when unparsable.
pub fn parse_limit(text: &str) -> Option<Option<u64>> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("unlimited") || text.eq_ignore_ascii_case("infinity") {
        return Some(None);
    }
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let value: u64 = text[..digits].parse().ok()?;
    let shift = match text[digits..].trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 10,
        "M" | "MB" | "MIB" => 20,
        "G" | "GB" | "GIB" => 30,
        "T" | "TB" | "TIB" => 40,
        _ => return None,
    };
    value.checked_mul(1u64 << shift).map(Some)
}

#[derive(Debug, Default)]
struct ResourceUsage {
    area: u64,
    memory: u64,
    disk: u64,
    file: u64,
}

impl ResourceUsage {
    fn slot(&mut self, kind: ResourceType) -> &mut u64 {
        match kind {
            ResourceType::Area => &mut self.area,
            ResourceType::Memory => &mut self.memory,
            ResourceType::Disk => &mut self.disk,
            ResourceType::File => &mut self.file,
        }
    }
}

/// Progress callback: `(tag, offset, extent) -> keep going`
pub type ProgressMonitor = Arc<dyn Fn(&str, u64, u64) -> bool + Send + Sync>;

struct ContextInner {
    limits: RwLock<ResourceLimits>,
    usage: Mutex<ResourceUsage>,
    codec: Mutex<()>,
    monitor: RwLock<Option<ProgressMonitor>>,
}

/// Shared process context
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ResourceLimits::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("limits", &*self.inner.limits.read())
            .field("usage", &*self.inner.usage.lock())
            .finish()
    }
}

impl Context {
    /// Create a context with the given limits
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                limits: RwLock::new(limits),
                usage: Mutex::new(ResourceUsage::default()),
                codec: Mutex::new(()),
                monitor: RwLock::new(None),
            }),
        }
    }

    /// Create a context configured from the environment
    pub fn from_env() -> Self {
        Self::new(ResourceLimits::from_env())
    }

    /// Current limits
    pub fn limits(&self) -> ResourceLimits {
        *self.inner.limits.read()
    }

    /// Change one limit. Caches already open are not migrated.
    pub fn set_limit(&self, kind: ResourceType, limit: Option<u64>) {
        log::debug!("set {kind} limit to {limit:?}");
        self.inner.limits.write().set(kind, limit);
    }

    /// Reserve `amount` of a resource.
    ///
    /// Returns `false`, reserving nothing, if the reservation would exceed
    /// the limit.
    pub fn acquire_resource(&self, kind: ResourceType, amount: u64) -> bool {
        let limit = self.inner.limits.read().get(kind);
        let mut usage = self.inner.usage.lock();
        let slot = usage.slot(kind);
        let wanted = slot.saturating_add(amount);
        let granted = limit.is_none_or(|limit| wanted <= limit);
        if granted {
            *slot = wanted;
        }
        log::trace!("acquire {kind} {amount}: {granted} ({wanted}/{limit:?})");
        granted
    }

    /// Return a reservation made with [`Context::acquire_resource`]
    pub fn relinquish_resource(&self, kind: ResourceType, amount: u64) {
        let mut usage = self.inner.usage.lock();
        let slot = usage.slot(kind);
        *slot = slot.saturating_sub(amount);
        log::trace!("relinquish {kind} {amount}: {} in use", *slot);
    }

    /// Amount of a resource currently reserved
    pub fn resource_usage(&self, kind: ResourceType) -> u64 {
        *self.inner.usage.lock().slot(kind)
    }

    /// Hold the codec lock for the lifetime of the guard.
    ///
    /// Coders that keep process-wide state take this around every call.
    pub fn codec_lock(&self) -> MutexGuard<'_, ()> {
        self.inner.codec.lock()
    }

    /// Install or remove the progress monitor
    pub fn set_progress_monitor(&self, monitor: Option<ProgressMonitor>) {
        *self.inner.monitor.write() = monitor;
    }

    /// Report progress. Returns `false` if the monitor asked to stop.
    pub fn progress(&self, tag: &str, offset: u64, extent: u64) -> bool {
        let monitor = self.inner.monitor.read().clone();
        match monitor {
            Some(monitor) => monitor(tag, offset, extent),
            None => true,
        }
    }

    /// True if both handles refer to the same context
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
