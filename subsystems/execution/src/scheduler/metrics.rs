//! # Scheduler Metrics
//!
//! Counters for scheduler activity. Purely observational; nothing in the
//! dispatch path reads them back.

use core::sync::atomic::{AtomicU64, Ordering};

/// Scheduler metrics
pub struct SchedulerMetrics {
    /// Threads created
    threads_created: AtomicU64,
    /// Threads killed
    threads_killed: AtomicU64,
    /// Suspend operations
    suspends: AtomicU64,
    /// Resume operations
    resumes: AtomicU64,
    /// Dispatcher invocations
    dispatches: AtomicU64,
    /// Threads switched onto the processor
    switches: AtomicU64,
    /// Dispatches that left the processor idle
    idle_transitions: AtomicU64,
}

impl SchedulerMetrics {
    /// Create new metrics
    pub const fn new() -> Self {
        Self {
            threads_created: AtomicU64::new(0),
            threads_killed: AtomicU64::new(0),
            suspends: AtomicU64::new(0),
            resumes: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            switches: AtomicU64::new(0),
            idle_transitions: AtomicU64::new(0),
        }
    }

    /// Record a thread creation
    pub fn record_thread_created(&self) {
        self.threads_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a thread kill
    pub fn record_thread_killed(&self) {
        self.threads_killed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a suspend
    pub fn record_suspend(&self) {
        self.suspends.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resume
    pub fn record_resume(&self) {
        self.resumes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatcher invocation
    pub fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a thread switched onto the processor
    pub fn record_switch(&self) {
        self.switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatch that idled the processor
    pub fn record_idle_transition(&self) {
        self.idle_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get threads created
    pub fn threads_created(&self) -> u64 {
        self.threads_created.load(Ordering::Relaxed)
    }

    /// Get threads killed
    pub fn threads_killed(&self) -> u64 {
        self.threads_killed.load(Ordering::Relaxed)
    }

    /// Get suspend count
    pub fn suspends(&self) -> u64 {
        self.suspends.load(Ordering::Relaxed)
    }

    /// Get resume count
    pub fn resumes(&self) -> u64 {
        self.resumes.load(Ordering::Relaxed)
    }

    /// Get dispatcher invocation count
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Get switch count
    pub fn switches(&self) -> u64 {
        self.switches.load(Ordering::Relaxed)
    }

    /// Get idle transition count
    pub fn idle_transitions(&self) -> u64 {
        self.idle_transitions.load(Ordering::Relaxed)
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.threads_created.store(0, Ordering::Relaxed);
        self.threads_killed.store(0, Ordering::Relaxed);
        self.suspends.store(0, Ordering::Relaxed);
        self.resumes.store(0, Ordering::Relaxed);
        self.dispatches.store(0, Ordering::Relaxed);
        self.switches.store(0, Ordering::Relaxed);
        self.idle_transitions.store(0, Ordering::Relaxed);
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
