//! # Resource Pool
//!
//! Tracks which thread holds which resource instance, so termination
//! can hand everything back in one call.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use osmium_execution::platform::ResourceReclaim;
use osmium_execution::ThreadId;
use spin::Mutex;

/// Resource instance identifier
pub type ResourceId = u64;

/// A pool of resource instances with per-thread ownership tracking
pub struct ResourcePool {
    /// Instances held, keyed by owning thread
    held: Mutex<BTreeMap<ThreadId, Vec<ResourceId>>>,
}

impl ResourcePool {
    /// Create an empty pool
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record that `thread` acquired `resource`
    pub fn acquire(&self, thread: ThreadId, resource: ResourceId) {
        self.held.lock().entry(thread).or_default().push(resource);
    }

    /// Number of instances held by `thread`
    pub fn held_by(&self, thread: ThreadId) -> usize {
        self.held.lock().get(&thread).map(|v| v.len()).unwrap_or(0)
    }

    /// Total number of held instances
    pub fn total_held(&self) -> usize {
        self.held.lock().values().map(|v| v.len()).sum()
    }
}

impl ResourceReclaim for ResourcePool {
    fn release_all(&self, thread: ThreadId) -> usize {
        let released = self
            .held
            .lock()
            .remove(&thread)
            .map(|v| v.len())
            .unwrap_or(0);
        if released > 0 {
            log::debug!("resource pool: released {} instance(s) of {:?}", released, thread);
        }
        released
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}
