//! # Scheduler
//!
//! The uniprocessor dispatch core. A [`Scheduler`] owns the ready queue,
//! the processor's mapping register, and the thread/task tables, and
//! exposes the five operations everything else is built from: create,
//! kill, suspend, resume, dispatch.
//!
//! Every lifecycle operation ends by invoking the dispatcher, making it
//! the single serialization point for all scheduling decisions. The
//! model is event-driven and non-preemptive: nothing takes the processor
//! away from a running thread except its own suspend or kill.

pub mod config;
pub mod metrics;
pub mod priority;
pub mod queue;
pub mod traits;

#[cfg(test)]
mod sched_tests;

pub use config::*;
pub use priority::*;
pub use queue::FifoQueue;
pub use traits::*;

use crate::event::Event;
use crate::platform::{DeviceTable, IoDevice, ResourceReclaim};
use crate::task::{PageMap, Task};
use crate::thread::{Thread, ThreadFlags, ThreadRegistry, ThreadState};
use crate::{ExecError, ExecResult, TaskId, ThreadId};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use osmium_hal::MappingRegister;
use spin::{Mutex, RwLock};

/// Dispatch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The processor already held a live running thread; nothing to do
    AlreadySatisfied,
    /// The named thread was switched onto the processor
    Switched(ThreadId),
    /// Nothing runnable; the processor is now idle
    Idle,
}

/// The uniprocessor scheduler
///
/// An explicit context object: each instance owns its queue, registers
/// and tables, so tests and embedders get fully isolated schedulers.
pub struct Scheduler {
    /// Configuration
    config: SchedulerConfig,
    /// Ready queue (FIFO by default)
    run_queue: Mutex<Box<dyn RunQueue>>,
    /// Processor occupancy: the mapping of the task currently running
    mapping: MappingRegister<PageMap>,
    /// All live threads
    threads: ThreadRegistry,
    /// All registered tasks
    tasks: RwLock<BTreeMap<TaskId, Arc<Task>>>,
    /// The system's devices (walked on kill to purge pending I/O)
    devices: DeviceTable,
    /// Resource manager (consulted on kill to release held instances)
    resources: RwLock<Option<Arc<dyn ResourceReclaim>>>,
    /// Activity counters
    metrics: metrics::SchedulerMetrics,
}

impl Scheduler {
    /// Create a scheduler with the stock FIFO ready queue
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_run_queue(config, Box::new(FifoQueue::new()))
    }

    /// Create a scheduler with a custom ready-queue policy
    ///
    /// The dispatch semantics are specified against FIFO order; an
    /// alternate policy trades that guarantee for its own.
    pub fn with_run_queue(config: SchedulerConfig, run_queue: Box<dyn RunQueue>) -> Self {
        Self {
            config,
            run_queue: Mutex::new(run_queue),
            mapping: MappingRegister::new(),
            threads: ThreadRegistry::new(),
            tasks: RwLock::new(BTreeMap::new()),
            devices: DeviceTable::new(),
            resources: RwLock::new(None),
            metrics: metrics::SchedulerMetrics::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get the thread registry
    pub fn threads(&self) -> &ThreadRegistry {
        &self.threads
    }

    /// Get the device table
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Register a device with the scheduler's device table
    pub fn register_device(&self, device: Arc<dyn IoDevice>) {
        self.devices.register(device);
    }

    /// Set the resource manager
    pub fn set_resource_manager(&self, resources: Arc<dyn ResourceReclaim>) {
        *self.resources.write() = Some(resources);
    }

    /// Get the activity counters
    pub fn metrics(&self) -> &metrics::SchedulerMetrics {
        &self.metrics
    }

    /// Create and register a new task
    pub fn create_task(&self, name: impl Into<String>) -> Arc<Task> {
        let task = Arc::new(Task::new(name));
        self.register_task(task.clone());
        task
    }

    /// Register an externally created task
    pub fn register_task(&self, task: Arc<Task>) {
        self.tasks.write().insert(task.id(), task);
    }

    /// Look up a registered task
    pub fn task(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.read().get(&id).cloned()
    }

    /// Number of threads currently queued ready
    pub fn ready_count(&self) -> usize {
        self.run_queue.lock().len()
    }

    /// The thread currently on the processor, if any.
    ///
    /// Resolved through the mapping register: mapping -> task ->
    /// current thread, requiring the thread to actually be Running. An
    /// empty register (idle processor) simply yields `None`.
    pub fn running_thread(&self) -> Option<Arc<Thread>> {
        let map = self.mapping.load()?;
        let task = self.task(map.task())?;
        let id = task.current_thread()?;
        let thread = self.threads.get(id)?;
        if thread.state().is_running() {
            Some(thread)
        } else {
            None
        }
    }

    /// Check whether the processor is idle
    pub fn is_idle(&self) -> bool {
        self.running_thread().is_none()
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Create a new thread on `task`.
    ///
    /// Fails (after still invoking the dispatcher, so any pending
    /// scheduling decision proceeds) when no task is given or the task
    /// is at its thread limit. The task's very first thread is handed
    /// straight to the dispatcher without queueing and `Ok(None)` is
    /// returned: dispatch, not the caller, owns the bootstrap thread.
    /// Every later thread is enqueued ready and returned as
    /// `Ok(Some(thread))`.
    pub fn create_thread(
        &self,
        task: Option<&Arc<Task>>,
        name: impl Into<String>,
    ) -> ExecResult<Option<Arc<Thread>>> {
        let task = match task {
            Some(task) => task,
            None => {
                log::debug!("create: no target task");
                self.dispatch();
                return Err(ExecError::TaskUnavailable);
            }
        };

        if task.thread_count() >= self.config.max_threads_per_task {
            log::debug!(
                "create: task {:?} at thread limit ({})",
                task.id(),
                self.config.max_threads_per_task
            );
            self.dispatch();
            return Err(ExecError::ThreadLimitReached);
        }

        // A task handed in from outside may not be registered yet; the
        // dispatcher must be able to resolve its mapping later.
        if self.task(task.id()).is_none() {
            self.register_task(task.clone());
        }

        let bootstrap = task.thread_count() == 0;
        let thread = Arc::new(Thread::new(ThreadId::new(), task.id(), name));
        if bootstrap {
            thread.set_flag(ThreadFlags::BOOTSTRAP);
        }

        task.add_thread(thread.id());
        self.threads.register(thread.clone())?;
        self.metrics.record_thread_created();
        log::debug!(
            "create: thread {:?} ({}) on task {:?}",
            thread.id(),
            thread.name(),
            task.id()
        );

        if bootstrap {
            self.dispatch_with(Some(&thread));
            return Ok(None);
        }

        self.run_queue.lock().enqueue(thread.id(), thread.priority());
        self.dispatch();
        Ok(Some(thread))
    }

    /// Kill `thread`, unwinding all of its outstanding commitments.
    ///
    /// Unconditional cleanup, in order: leave the ready queue, release
    /// the processor if held, cancel pending I/O on every device,
    /// release held resources, detach from the owning task (terminating
    /// the task if this was its last thread), then dispatch. A second
    /// kill on an already killed thread is rejected and runs none of
    /// the cleanup again.
    pub fn kill_thread(&self, thread: &Arc<Thread>) -> ExecResult<()> {
        let state = thread.state();
        if state.is_terminated() {
            return Err(ExecError::InvalidState { current: state });
        }
        log::debug!("kill: thread {:?} ({:?})", thread.id(), state);

        if state.is_ready() {
            self.run_queue.lock().remove(thread.id());
        }

        if state.is_running() {
            if let Some(task) = self.task(thread.task()) {
                task.set_current_thread(None);
            }
            self.mapping.clear();
        }

        thread.set_state(ThreadState::Killed);

        self.devices.for_each(|device| {
            device.cancel_pending_io(thread.id());
        });

        if let Some(resources) = self.resources.read().as_ref() {
            resources.release_all(thread.id());
        }

        if let Some(task) = self.task(thread.task()) {
            task.remove_thread(thread.id());
            if task.thread_count() == 0 {
                task.kill();
            }
        }
        self.threads.unregister(thread.id()).ok();
        self.metrics.record_thread_killed();

        self.dispatch();
        Ok(())
    }

    /// Suspend `thread` on `event`.
    ///
    /// The thread need not be the running one: a thread already waiting
    /// (say, on a page-fault completion) can be suspended again, which
    /// deepens its wait. The thread is unconditionally removed from the
    /// ready queue and registered in the event's wait set, then the
    /// dispatcher runs. Only *after* dispatch does a self-suspending
    /// running thread give up its status and the processor: the
    /// dispatcher must see the old occupancy while it decides whether
    /// anything is running, so a self-suspend leaves the processor idle
    /// until the next dispatch promotes the queue head.
    pub fn suspend_thread(&self, thread: &Arc<Thread>, event: &Event) -> ExecResult<()> {
        let before = thread.state();
        match before {
            ThreadState::Killed => {
                return Err(ExecError::InvalidState { current: before });
            }
            ThreadState::Waiting { depth } => {
                thread.set_state(ThreadState::Waiting { depth: depth.saturating_add(1) });
            }
            ThreadState::Ready => {
                thread.set_state(ThreadState::waiting());
            }
            // finalized after dispatch
            ThreadState::Running => {}
        }
        log::debug!(
            "suspend: thread {:?} on event {} ({:?})",
            thread.id(),
            event.name(),
            before
        );

        self.run_queue.lock().remove(thread.id());
        event.add_waiter(thread.id());
        self.metrics.record_suspend();

        self.dispatch();

        if before.is_running() {
            thread.set_state(ThreadState::waiting());
            self.mapping.clear();
            if let Some(task) = self.task(thread.task()) {
                task.set_current_thread(None);
            }
        }
        Ok(())
    }

    /// Resume `thread` after an event completion.
    ///
    /// A running thread is untouched; a thread at waiting depth one
    /// becomes ready and is enqueued; a deeper waiter just sheds one
    /// level; an already ready thread is tolerated as a double-signal
    /// (re-enqueued only if it somehow left the queue). A killed thread
    /// cannot be resumed.
    pub fn resume_thread(&self, thread: &Arc<Thread>) -> ExecResult<()> {
        let state = thread.state();
        log::debug!("resume: thread {:?} ({:?})", thread.id(), state);
        match state {
            ThreadState::Running => {}
            ThreadState::Waiting { depth: 1 } => {
                thread.set_state(ThreadState::Ready);
                self.run_queue.lock().enqueue(thread.id(), thread.priority());
            }
            ThreadState::Waiting { depth } => {
                thread.set_state(ThreadState::Waiting { depth: depth - 1 });
            }
            ThreadState::Ready => {
                let mut queue = self.run_queue.lock();
                if !queue.contains(thread.id()) {
                    queue.enqueue(thread.id(), thread.priority());
                }
            }
            ThreadState::Killed => {
                return Err(ExecError::InvalidState { current: state });
            }
        }
        self.metrics.record_resume();
        self.dispatch();
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Decide who occupies the processor.
    ///
    /// If a live thread is already running it keeps the processor. With
    /// an empty ready queue the processor goes idle. Otherwise the
    /// oldest ready thread (strict FIFO, no priority comparison) is
    /// switched in: its status becomes Running, its task's mapping is
    /// installed in the mapping register, and the task's current-thread
    /// reference is set.
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch_with(None)
    }

    /// Dispatch with an optional handoff thread (the bootstrap rule).
    ///
    /// A handoff thread bypasses the queue when the processor is free;
    /// when it is busy the handoff joins the ready queue like any other
    /// ready thread rather than being stranded unqueued.
    fn dispatch_with(&self, handoff: Option<&Arc<Thread>>) -> Dispatch {
        self.metrics.record_dispatch();

        if let Some(running) = self.running_thread() {
            if let Some(thread) = handoff {
                let mut queue = self.run_queue.lock();
                if !queue.contains(thread.id()) {
                    queue.enqueue(thread.id(), thread.priority());
                }
            }
            log::trace!("dispatch: thread {:?} keeps the processor", running.id());
            return Dispatch::AlreadySatisfied;
        }

        let next = match handoff {
            Some(thread) => Some(Arc::clone(thread)),
            None => {
                let id = self.run_queue.lock().dequeue();
                id.and_then(|id| self.threads.get(id))
            }
        };

        let next = match next {
            Some(thread) => thread,
            None => {
                self.mapping.clear();
                self.metrics.record_idle_transition();
                log::debug!("dispatch: no runnable thread, processor idle");
                return Dispatch::Idle;
            }
        };

        next.set_state(ThreadState::Running);
        if let Some(task) = self.task(next.task()) {
            self.mapping.store(task.page_map());
            task.set_current_thread(Some(next.id()));
        }
        self.metrics.record_switch();
        log::debug!("dispatch: thread {:?} ({}) now running", next.id(), next.name());
        Dispatch::Switched(next.id())
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Log the scheduler's tables.
    ///
    /// Hook for the surrounding framework to call after reporting an
    /// error or warning, so the state at that moment is preserved in
    /// the log.
    pub fn dump_state(&self, reason: &str) {
        log::warn!("scheduler state dump: {}", reason);
        match self.mapping.load() {
            Some(map) => log::warn!("  occupancy: task {:?}", map.task()),
            None => log::warn!("  occupancy: idle"),
        }
        log::warn!("  ready queue: {:?}", self.run_queue.lock().ids());
        self.threads.for_each(|thread| {
            log::warn!(
                "  thread {:?} ({}) task {:?} state {:?}",
                thread.id(),
                thread.name(),
                thread.task(),
                thread.state()
            );
        });
    }
}
