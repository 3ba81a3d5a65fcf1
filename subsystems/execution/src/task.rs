//! # Task Management
//!
//! The owning entity behind every thread: its thread set, its
//! current-thread back-reference, and the page mapping the dispatcher
//! installs on the processor while one of its threads runs.

use crate::{TaskId, ThreadId};
use alloc::string::String;
use alloc::vec::Vec;
use spin::RwLock;

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task is live and may hold threads
    Live,
    /// Task has been terminated
    Terminated,
}

/// Page mapping handle
///
/// The cheap token the mapping register holds while a task occupies the
/// processor; resolves back to the owning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMap {
    task: TaskId,
}

impl PageMap {
    /// Get the owning task's ID
    pub fn task(&self) -> TaskId {
        self.task
    }
}

/// Task structure
pub struct Task {
    /// Task ID
    id: TaskId,
    /// Task name
    name: String,
    /// Current state
    state: RwLock<TaskState>,
    /// All threads belonging to this task
    threads: RwLock<Vec<ThreadId>>,
    /// The thread of this task currently on the processor, if any
    current_thread: RwLock<Option<ThreadId>>,
}

impl Task {
    /// Create a new live task
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            state: RwLock::new(TaskState::Live),
            threads: RwLock::new(Vec::new()),
            current_thread: RwLock::new(None),
        }
    }

    /// Get task ID
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get state
    pub fn state(&self) -> TaskState {
        *self.state.read()
    }

    /// Check whether the task is live
    pub fn is_live(&self) -> bool {
        self.state() == TaskState::Live
    }

    /// Get the page mapping handle for this task
    pub fn page_map(&self) -> PageMap {
        PageMap { task: self.id }
    }

    /// Add a thread to this task's thread set
    pub fn add_thread(&self, thread: ThreadId) {
        self.threads.write().push(thread);
    }

    /// Remove a thread from this task's thread set
    pub fn remove_thread(&self, thread: ThreadId) {
        self.threads.write().retain(|&t| t != thread);
    }

    /// Get thread count
    pub fn thread_count(&self) -> usize {
        self.threads.read().len()
    }

    /// Get the thread IDs belonging to this task
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.read().clone()
    }

    /// Get the currently running thread of this task, if any
    pub fn current_thread(&self) -> Option<ThreadId> {
        *self.current_thread.read()
    }

    /// Set or clear the currently running thread of this task
    pub fn set_current_thread(&self, thread: Option<ThreadId>) {
        *self.current_thread.write() = thread;
    }

    /// Terminate the task
    pub fn kill(&self) {
        log::debug!("task {:?} ({}) terminated", self.id, self.name);
        *self.state.write() = TaskState::Terminated;
        *self.current_thread.write() = None;
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("threads", &self.thread_count())
            .finish()
    }
}
