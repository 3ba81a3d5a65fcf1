//! # Events
//!
//! The wait-set container threads suspend on. An event does not know
//! *why* its waiters wait; it only records who must be resumed when the
//! event completes. Completion resumes each registration exactly once,
//! which is what unwinds nested waits one level per completed event.

use crate::scheduler::Scheduler;
use crate::ThreadId;
use alloc::string::String;
use alloc::vec::Vec;
use spin::Mutex;

/// An awaitable event
pub struct Event {
    /// Event name (for diagnostics)
    name: String,
    /// Threads suspended on this event
    waiters: Mutex<Vec<ThreadId>>,
}

impl Event {
    /// Create a new event with no waiters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Get the event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a thread in this event's wait set.
    ///
    /// One registration per suspension: a thread suspended twice on the
    /// same event is resumed twice when it completes.
    pub fn add_waiter(&self, thread: ThreadId) {
        self.waiters.lock().push(thread);
    }

    /// Remove one registration of `thread`; no-op when absent.
    pub fn remove_waiter(&self, thread: ThreadId) -> bool {
        let mut waiters = self.waiters.lock();
        if let Some(pos) = waiters.iter().position(|&t| t == thread) {
            waiters.remove(pos);
            true
        } else {
            false
        }
    }

    /// Get the number of outstanding registrations
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Complete the event: drain the wait set and resume every waiter.
    ///
    /// Returns how many waiters were resumed. A waiter that died while
    /// waiting (killed, or no longer registered) is logged and skipped;
    /// one dead waiter must never derail the completion of an event.
    pub fn notify_all(&self, scheduler: &Scheduler) -> usize {
        let drained: Vec<ThreadId> = core::mem::take(&mut *self.waiters.lock());
        let mut resumed = 0;
        for id in drained {
            let thread = match scheduler.threads().get(id) {
                Some(thread) => thread,
                None => {
                    log::warn!("event {}: waiter {:?} vanished before completion", self.name, id);
                    continue;
                }
            };
            match scheduler.resume_thread(&thread) {
                Ok(()) => resumed += 1,
                Err(err) => {
                    log::warn!(
                        "event {}: skipping waiter {:?} ({:?})",
                        self.name,
                        id,
                        err
                    );
                }
            }
        }
        resumed
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
