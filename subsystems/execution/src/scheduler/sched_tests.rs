//! # Scheduler Tests
//!
//! Lifecycle and dispatch tests, including the documented invariants:
//! processor mutual exclusion, ready-queue consistency, FIFO fairness,
//! nested-wait round trips and kill cleanup.

use super::*;
use crate::event::Event;
use crate::{ExecError, ThreadId};
use crate::platform::{IoDevice, ResourceReclaim};
use crate::thread::ThreadState;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

// =========================================================================
// Test Collaborators
// =========================================================================

struct RecordingDevice {
    name: &'static str,
    cancelled: Mutex<Vec<ThreadId>>,
}

impl RecordingDevice {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            cancelled: Mutex::new(Vec::new()),
        })
    }

    fn cancel_count(&self) -> usize {
        self.cancelled.lock().len()
    }
}

impl IoDevice for RecordingDevice {
    fn name(&self) -> &str {
        self.name
    }

    fn cancel_pending_io(&self, thread: ThreadId) -> bool {
        self.cancelled.lock().push(thread);
        true
    }
}

struct RecordingReclaim {
    released: Mutex<Vec<ThreadId>>,
}

impl RecordingReclaim {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            released: Mutex::new(Vec::new()),
        })
    }

    fn release_count(&self) -> usize {
        self.released.lock().len()
    }
}

impl ResourceReclaim for RecordingReclaim {
    fn release_all(&self, thread: ThreadId) -> usize {
        self.released.lock().push(thread);
        1
    }
}

/// Check the two structural invariants: at most one Running thread,
/// matching the occupancy register; and a thread is queued ready iff
/// its status is Ready.
fn assert_invariants(sched: &Scheduler) {
    let running = sched.threads().get_by_state(ThreadState::Running);
    assert!(running.len() <= 1, "more than one Running thread");
    match sched.running_thread() {
        Some(current) => {
            assert_eq!(running.len(), 1);
            assert_eq!(running[0].id(), current.id());
        }
        None => assert!(running.is_empty(), "Running thread invisible to occupancy"),
    }

    let queued = sched.run_queue.lock().ids();
    for id in &queued {
        let thread = sched.threads().get(*id).expect("queued thread not registered");
        assert!(thread.state().is_ready(), "queued thread not Ready");
    }
    for thread in sched.threads().get_by_state(ThreadState::Ready) {
        assert!(queued.contains(&thread.id()), "Ready thread missing from queue");
    }
}

// =========================================================================
// Create
// =========================================================================

#[test]
fn test_bootstrap_thread_runs_without_queueing() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");

    // a task's first thread is handed to the dispatcher, not the caller
    assert!(sched.create_thread(Some(&task), "main").unwrap().is_none());

    let running = sched.running_thread().expect("bootstrap thread should run");
    assert!(running.is_bootstrap());
    assert_eq!(running.task(), task.id());
    assert_eq!(task.current_thread(), Some(running.id()));
    assert_eq!(sched.ready_count(), 0);
    assert_invariants(&sched);
}

#[test]
fn test_second_thread_queues_behind_running() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();

    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();
    assert!(t2.state().is_ready());
    assert!(!t2.is_bootstrap());
    assert_eq!(sched.ready_count(), 1);
    // the dispatcher inside create saw the processor occupied
    assert_eq!(sched.running_thread().unwrap().id(), t1.id());
    assert_invariants(&sched);
}

#[test]
fn test_create_without_task_fails_but_dispatches() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    // self-suspend leaves the processor idle with t2 still queued
    let event = Event::new("io");
    sched.suspend_thread(&t1, &event).unwrap();
    assert!(sched.is_idle());
    assert_eq!(sched.ready_count(), 1);

    // the failed create still invokes the dispatcher, which promotes t2
    assert!(matches!(
        sched.create_thread(None, "nobody"),
        Err(ExecError::TaskUnavailable)
    ));
    assert_eq!(sched.running_thread().unwrap().id(), t2.id());
    assert_invariants(&sched);
}

#[test]
fn test_create_over_thread_limit() {
    let sched = Scheduler::new(SchedulerConfig::with_thread_limit(1));
    let task = sched.create_task("small");
    sched.create_thread(Some(&task), "only").unwrap();

    assert!(matches!(
        sched.create_thread(Some(&task), "extra"),
        Err(ExecError::ThreadLimitReached)
    ));
    assert_eq!(task.thread_count(), 1);
    assert_eq!(sched.threads().count_by_task(task.id()), 1);
    assert_invariants(&sched);
}

// =========================================================================
// Dispatch
// =========================================================================

#[test]
fn test_fifo_dispatch_order() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let a = sched.create_thread(Some(&task), "a").unwrap().unwrap();
    let b = sched.create_thread(Some(&task), "b").unwrap().unwrap();

    // oldest enqueued wins, regardless of priority
    b.set_priority(Priority::MAX);

    sched.kill_thread(&t1).unwrap();
    assert_eq!(sched.running_thread().unwrap().id(), a.id());
    sched.kill_thread(&a).unwrap();
    assert_eq!(sched.running_thread().unwrap().id(), b.id());
    assert_invariants(&sched);
}

#[test]
fn test_dispatch_on_empty_queue_reports_idle() {
    let sched = Scheduler::new(SchedulerConfig::default());
    assert_eq!(sched.dispatch(), Dispatch::Idle);
    assert!(sched.is_idle());
    assert!(sched.metrics().idle_transitions() >= 1);
}

#[test]
fn test_dispatch_with_running_thread_is_satisfied() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    assert_eq!(sched.dispatch(), Dispatch::AlreadySatisfied);
}

// =========================================================================
// Suspend / Resume
// =========================================================================

#[test]
fn test_suspend_running_thread_releases_processor() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    let event = Event::new("disk");
    sched.suspend_thread(&t1, &event).unwrap();

    assert_eq!(t1.state(), ThreadState::waiting());
    assert!(sched.is_idle());
    assert_eq!(task.current_thread(), None);
    assert_eq!(event.waiter_count(), 1);
    assert_invariants(&sched);

    // the next dispatch promotes the queue head
    assert_eq!(sched.dispatch(), Dispatch::Switched(t2.id()));
    assert!(t2.state().is_running());
    assert_invariants(&sched);
}

#[test]
fn test_suspend_ready_thread() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    let event = Event::new("lock");
    sched.suspend_thread(&t2, &event).unwrap();

    // t2 left the queue and the running thread was untouched
    assert_eq!(t2.state(), ThreadState::waiting());
    assert_eq!(sched.ready_count(), 0);
    assert_eq!(sched.running_thread().unwrap().id(), t1.id());
    assert_invariants(&sched);
}

#[test]
fn test_nested_wait_round_trip() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    let e1 = Event::new("pagefault");
    let e2 = Event::new("swap-in");
    sched.suspend_thread(&t1, &e1).unwrap();
    assert_eq!(t1.state(), ThreadState::Waiting { depth: 1 });

    // t2 takes over while t1 waits; suspending t1 again deepens the wait
    sched.dispatch();
    assert!(t2.state().is_running());
    sched.suspend_thread(&t1, &e2).unwrap();
    assert_eq!(t1.state(), ThreadState::Waiting { depth: 2 });
    assert_eq!(e1.waiter_count(), 1);
    assert_eq!(e2.waiter_count(), 1);

    // one resume sheds one level; the thread is not ready yet
    sched.resume_thread(&t1).unwrap();
    assert_eq!(t1.state(), ThreadState::Waiting { depth: 1 });
    assert_eq!(sched.ready_count(), 0);

    // the second resume makes it ready exactly once
    sched.resume_thread(&t1).unwrap();
    assert!(t1.state().is_ready());
    assert_eq!(sched.ready_count(), 1);
    assert_eq!(sched.running_thread().unwrap().id(), t2.id());
    assert_invariants(&sched);
}

#[test]
fn test_resume_running_is_noop() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();

    sched.resume_thread(&t1).unwrap();
    assert!(t1.state().is_running());
    assert_eq!(sched.running_thread().unwrap().id(), t1.id());
    assert_invariants(&sched);
}

#[test]
fn test_resume_ready_tolerates_double_signal() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    sched.resume_thread(&t2).unwrap();
    // no duplicate queue entry
    assert_eq!(sched.ready_count(), 1);
    assert!(t2.state().is_ready());
    assert_invariants(&sched);
}

#[test]
fn test_resume_killed_rejected() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    sched.kill_thread(&t1).unwrap();

    assert_eq!(
        sched.resume_thread(&t1),
        Err(ExecError::InvalidState {
            current: ThreadState::Killed
        })
    );
}

#[test]
fn test_suspend_killed_rejected() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    sched.kill_thread(&t1).unwrap();

    let event = Event::new("late");
    assert_eq!(
        sched.suspend_thread(&t1, &event),
        Err(ExecError::InvalidState {
            current: ThreadState::Killed
        })
    );
    assert_eq!(event.waiter_count(), 0);
}

// =========================================================================
// Kill
// =========================================================================

#[test]
fn test_kill_running_thread_cleanup() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let disk = RecordingDevice::new("disk0");
    let tty = RecordingDevice::new("tty0");
    sched.register_device(disk.clone());
    sched.register_device(tty.clone());
    let reclaim = RecordingReclaim::new();
    sched.set_resource_manager(reclaim.clone());

    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    sched.kill_thread(&t1).unwrap();

    assert_eq!(t1.state(), ThreadState::Killed);
    assert_eq!(disk.cancel_count(), 1);
    assert_eq!(tty.cancel_count(), 1);
    assert_eq!(reclaim.release_count(), 1);
    assert_eq!(task.thread_count(), 1);
    assert!(task.is_live());
    // the concluding dispatch hands the processor to the queue head
    assert_eq!(sched.running_thread().unwrap().id(), t2.id());
    assert_invariants(&sched);
}

#[test]
fn test_double_kill_rejected_without_recleanup() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let disk = RecordingDevice::new("disk0");
    sched.register_device(disk.clone());

    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();

    sched.kill_thread(&t1).unwrap();
    assert_eq!(disk.cancel_count(), 1);

    assert_eq!(
        sched.kill_thread(&t1),
        Err(ExecError::InvalidState {
            current: ThreadState::Killed
        })
    );
    assert_eq!(disk.cancel_count(), 1, "cleanup must not run twice");
}

#[test]
fn test_kill_last_thread_terminates_task() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();

    sched.kill_thread(&t1).unwrap();
    assert!(!task.is_live());
    assert_eq!(task.thread_count(), 0);
    assert!(sched.is_idle());
    assert_eq!(sched.threads().count(), 0);
}

#[test]
fn test_kill_ready_thread_leaves_queue() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let t2 = sched.create_thread(Some(&task), "worker").unwrap().unwrap();

    sched.kill_thread(&t2).unwrap();
    assert_eq!(sched.ready_count(), 0);
    assert_eq!(t2.state(), ThreadState::Killed);
    assert_eq!(sched.running_thread().unwrap().id(), t1.id());
    assert_invariants(&sched);
}

#[test]
fn test_kill_waiting_thread() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();

    let event = Event::new("net");
    sched.suspend_thread(&t1, &event).unwrap();
    sched.kill_thread(&t1).unwrap();

    assert_eq!(t1.state(), ThreadState::Killed);
    assert!(sched.is_idle());
    assert_invariants(&sched);
}

// =========================================================================
// Alternate Queue Policy
// =========================================================================

/// A LIFO queue: the one place the stock FIFO guarantee is traded away.
struct LifoQueue {
    stack: Vec<ThreadId>,
}

impl RunQueue for LifoQueue {
    fn enqueue(&mut self, id: ThreadId, _priority: Priority) {
        self.stack.push(id);
    }

    fn dequeue(&mut self) -> Option<ThreadId> {
        self.stack.pop()
    }

    fn peek(&self) -> Option<ThreadId> {
        self.stack.last().copied()
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn len(&self) -> usize {
        self.stack.len()
    }

    fn remove(&mut self, id: ThreadId) -> bool {
        if let Some(pos) = self.stack.iter().position(|&x| x == id) {
            self.stack.remove(pos);
            true
        } else {
            false
        }
    }

    fn contains(&self, id: ThreadId) -> bool {
        self.stack.iter().any(|&x| x == id)
    }

    fn ids(&self) -> Vec<ThreadId> {
        self.stack.iter().rev().copied().collect()
    }
}

#[test]
fn test_custom_run_queue_policy() {
    let sched = Scheduler::with_run_queue(
        SchedulerConfig::default(),
        alloc::boxed::Box::new(LifoQueue { stack: Vec::new() }),
    );
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let a = sched.create_thread(Some(&task), "a").unwrap().unwrap();
    let b = sched.create_thread(Some(&task), "b").unwrap().unwrap();

    // under LIFO the youngest ready thread wins instead
    sched.kill_thread(&t1).unwrap();
    assert_eq!(sched.running_thread().unwrap().id(), b.id());
    sched.kill_thread(&b).unwrap();
    assert_eq!(sched.running_thread().unwrap().id(), a.id());
}

// =========================================================================
// Metrics
// =========================================================================

#[test]
fn test_dump_state_runs_on_any_state() {
    let sched = Scheduler::new(SchedulerConfig::default());
    sched.dump_state("empty scheduler");

    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    sched.create_thread(Some(&task), "worker").unwrap().unwrap();
    assert!(sched.devices().is_empty());
    sched.dump_state("two threads");
}

#[test]
fn test_metrics_track_lifecycle_activity() {
    let sched = Scheduler::new(SchedulerConfig::default());
    let task = sched.create_task("init");
    sched.create_thread(Some(&task), "main").unwrap();
    let t1 = sched.running_thread().unwrap();
    let event = Event::new("io");
    sched.suspend_thread(&t1, &event).unwrap();
    sched.resume_thread(&t1).unwrap();
    sched.kill_thread(&t1).unwrap();

    let m = sched.metrics();
    assert_eq!(m.threads_created(), 1);
    assert_eq!(m.threads_killed(), 1);
    assert_eq!(m.suspends(), 1);
    assert_eq!(m.resumes(), 1);
    // create + suspend + resume + kill each dispatched at least once
    assert!(m.dispatches() >= 4);
}
