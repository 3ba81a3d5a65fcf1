//! # Simulated Devices
//!
//! A device that queues I/O requests on behalf of threads. Requests are
//! never serviced here; they exist to be enumerated and cancelled when
//! their owning thread terminates.

use alloc::string::String;
use alloc::vec::Vec;
use osmium_execution::platform::IoDevice;
use osmium_execution::ThreadId;
use spin::Mutex;

/// A pending I/O request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoRequest {
    /// The thread the request belongs to
    pub thread: ThreadId,
    /// Target block number
    pub block: u64,
}

/// A device holding a queue of pending I/O requests
pub struct QueuedDevice {
    /// Device name
    name: String,
    /// Pending requests, oldest first
    pending: Mutex<Vec<IoRequest>>,
}

impl QueuedDevice {
    /// Create a new device with an empty request queue
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queue an I/O request on behalf of `thread`
    pub fn enqueue_request(&self, thread: ThreadId, block: u64) {
        log::debug!("{}: request for block {} from {:?}", self.name, block, thread);
        self.pending.lock().push(IoRequest { thread, block });
    }

    /// Total number of pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of pending requests belonging to `thread`
    pub fn pending_for(&self, thread: ThreadId) -> usize {
        self.pending.lock().iter().filter(|r| r.thread == thread).count()
    }
}

impl IoDevice for QueuedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn cancel_pending_io(&self, thread: ThreadId) -> bool {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|r| r.thread != thread);
        let cancelled = before - pending.len();
        if cancelled > 0 {
            log::debug!("{}: cancelled {} request(s) of {:?}", self.name, cancelled, thread);
        }
        cancelled > 0
    }
}
