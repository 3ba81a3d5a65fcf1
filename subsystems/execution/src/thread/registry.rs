//! # Thread Registry
//!
//! Table of all live threads known to one scheduler instance. Owned by
//! the scheduler rather than held in a global so every test (and every
//! embedder) gets an isolated view.

use super::{Thread, ThreadState};
use crate::{ExecError, ExecResult, TaskId, ThreadId};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::RwLock;

/// Thread registry
pub struct ThreadRegistry {
    /// All threads by ID
    threads: RwLock<BTreeMap<ThreadId, Arc<Thread>>>,
    /// Threads by task
    by_task: RwLock<BTreeMap<TaskId, Vec<ThreadId>>>,
}

impl ThreadRegistry {
    /// Create a new registry
    pub const fn new() -> Self {
        Self {
            threads: RwLock::new(BTreeMap::new()),
            by_task: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a new thread
    pub fn register(&self, thread: Arc<Thread>) -> ExecResult<()> {
        let id = thread.id();
        let task = thread.task();

        let mut threads = self.threads.write();
        if threads.contains_key(&id) {
            return Err(ExecError::AlreadyExists);
        }

        threads.insert(id, thread);
        drop(threads);

        self.by_task.write().entry(task).or_default().push(id);

        Ok(())
    }

    /// Unregister a thread
    pub fn unregister(&self, id: ThreadId) -> ExecResult<Arc<Thread>> {
        let mut threads = self.threads.write();
        let thread = threads.remove(&id).ok_or(ExecError::ThreadNotFound)?;

        let task = thread.task();
        drop(threads);

        if let Some(v) = self.by_task.write().get_mut(&task) {
            v.retain(|&t| t != id);
        }

        Ok(thread)
    }

    /// Get a thread by ID
    pub fn get(&self, id: ThreadId) -> Option<Arc<Thread>> {
        self.threads.read().get(&id).cloned()
    }

    /// Get all threads for a task
    pub fn get_by_task(&self, task: TaskId) -> Vec<Arc<Thread>> {
        let by_task = self.by_task.read();
        let threads = self.threads.read();

        by_task
            .get(&task)
            .map(|ids| ids.iter().filter_map(|id| threads.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Get all threads in a state
    pub fn get_by_state(&self, state: ThreadState) -> Vec<Arc<Thread>> {
        self.threads
            .read()
            .values()
            .filter(|t| t.state() == state)
            .cloned()
            .collect()
    }

    /// Get thread count
    pub fn count(&self) -> usize {
        self.threads.read().len()
    }

    /// Get thread count for a task
    pub fn count_by_task(&self, task: TaskId) -> usize {
        self.by_task.read().get(&task).map(|v| v.len()).unwrap_or(0)
    }

    /// Iterate over all threads
    pub fn for_each<F>(&self, f: F)
    where
        F: Fn(&Arc<Thread>),
    {
        for thread in self.threads.read().values() {
            f(thread);
        }
    }
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
