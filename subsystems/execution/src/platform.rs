//! # Platform Contracts
//!
//! The narrow interfaces the scheduler consumes from the surrounding
//! platform: device I/O cancellation and resource reclamation. Both are
//! exercised only by thread termination, which must unwind every
//! outstanding commitment a thread holds.

use crate::ThreadId;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::RwLock;

/// A device that may hold pending I/O requests on behalf of threads
pub trait IoDevice: Send + Sync {
    /// Get the device name
    fn name(&self) -> &str;

    /// Cancel every pending I/O request owned by `thread`.
    ///
    /// Returns whether anything was cancelled. Must be idempotent: a
    /// thread with no pending request on this device is a no-op.
    fn cancel_pending_io(&self, thread: ThreadId) -> bool;
}

/// The system's device table
///
/// An enumerable set of devices; thread termination walks it to purge
/// the victim's pending requests from every device.
pub struct DeviceTable {
    devices: RwLock<Vec<Arc<dyn IoDevice>>>,
}

impl DeviceTable {
    /// Create an empty device table
    pub const fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Register a device
    pub fn register(&self, device: Arc<dyn IoDevice>) {
        log::debug!("device table: registered {}", device.name());
        self.devices.write().push(device);
    }

    /// Get the number of registered devices
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Iterate over all devices
    pub fn for_each<F>(&self, f: F)
    where
        F: Fn(&Arc<dyn IoDevice>),
    {
        for device in self.devices.read().iter() {
            f(device);
        }
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Reclaims every resource instance a thread holds
pub trait ResourceReclaim: Send + Sync {
    /// Release all resources held by `thread`, returning how many
    /// instances were released. Idempotent if the thread holds none.
    fn release_all(&self, thread: ThreadId) -> usize;
}
