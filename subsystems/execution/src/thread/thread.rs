//! # Thread Record
//!
//! Core per-thread data structure: state, owning task, informational
//! priority and flags. Queue membership is not stored here - the ready
//! queue and event wait sets are the source of truth for it.

use crate::scheduler::Priority;
use crate::{TaskId, ThreadId};
use alloc::string::String;

/// Thread flags
pub mod flags {
    use bitflags::bitflags;

    bitflags! {
        /// Thread flags
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct ThreadFlags: u32 {
            /// The task's first thread, handed to the dispatcher
            /// without queueing at creation
            const BOOTSTRAP = 1 << 0;
        }
    }
}

pub use flags::ThreadFlags;

use super::ThreadState;

/// Thread structure
pub struct Thread {
    /// Unique identifier
    id: ThreadId,
    /// Owning task (non-owning back-reference)
    task: TaskId,
    /// Thread name (for diagnostics)
    name: String,
    /// Current state
    state: spin::RwLock<ThreadState>,
    /// Informational priority; never consulted by FIFO dispatch
    priority: spin::RwLock<Priority>,
    /// Flags
    flags: spin::RwLock<ThreadFlags>,
}

impl Thread {
    /// Create a new thread record in the Ready state.
    pub fn new(id: ThreadId, task: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            task,
            name: name.into(),
            state: spin::RwLock::new(ThreadState::Ready),
            priority: spin::RwLock::new(Priority::DEFAULT),
            flags: spin::RwLock::new(ThreadFlags::empty()),
        }
    }

    /// Get thread ID
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Get the owning task's ID
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Get thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current state
    pub fn state(&self) -> ThreadState {
        *self.state.read()
    }

    /// Set thread state
    ///
    /// Transitions are the scheduler's business; this only checks the
    /// state machine's legality in debug builds.
    pub fn set_state(&self, state: ThreadState) {
        let mut current = self.state.write();
        debug_assert!(
            current.can_transition_to(&state),
            "illegal thread state transition {:?} -> {:?}",
            *current,
            state
        );
        *current = state;
    }

    /// Get priority
    pub fn priority(&self) -> Priority {
        *self.priority.read()
    }

    /// Set priority
    pub fn set_priority(&self, priority: Priority) {
        *self.priority.write() = priority;
    }

    /// Get flags
    pub fn flags(&self) -> ThreadFlags {
        *self.flags.read()
    }

    /// Set a flag
    pub fn set_flag(&self, flag: ThreadFlags) {
        self.flags.write().insert(flag);
    }

    /// Clear a flag
    pub fn clear_flag(&self, flag: ThreadFlags) {
        self.flags.write().remove(flag);
    }

    /// Check if this was its task's bootstrap thread
    pub fn is_bootstrap(&self) -> bool {
        self.flags.read().contains(ThreadFlags::BOOTSTRAP)
    }
}

impl core::fmt::Debug for Thread {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("task", &self.task)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
