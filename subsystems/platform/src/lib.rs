//! # Osmium Platform
//!
//! Simulated implementations of the collaborator contracts the
//! execution subsystem consumes:
//! - Devices holding cancellable pending I/O requests
//! - A resource pool tracking which thread holds which instance
//!
//! Nothing here performs real I/O; the platform exists so thread
//! termination has actual commitments to unwind and so full-system
//! scenarios can run against concrete collaborators.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod device;
pub mod resources;


pub use device::{IoRequest, QueuedDevice};
pub use resources::ResourcePool;
