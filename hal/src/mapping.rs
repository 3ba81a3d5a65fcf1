//! # Mapping Register
//!
//! The single processor-occupancy slot. It holds the mapping handle of
//! whichever address space is currently on the processor, or nothing when
//! the processor is idle.

use spin::RwLock;

/// The processor's current-mapping register.
///
/// Generic over the mapping handle `M` so the execution subsystem can
/// store whatever cheap token resolves back to the owning task. An empty
/// register is a valid, queryable state (an idle processor), which is why
/// [`load`](Self::load) returns `Option` rather than an error.
#[derive(Debug)]
pub struct MappingRegister<M> {
    current: RwLock<Option<M>>,
}

impl<M: Clone> MappingRegister<M> {
    /// Create an empty register (idle processor).
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Read the current mapping, or `None` when nothing is mapped.
    pub fn load(&self) -> Option<M> {
        self.current.read().clone()
    }

    /// Install a mapping on the processor.
    pub fn store(&self, mapping: M) {
        *self.current.write() = Some(mapping);
    }

    /// Clear the register, leaving the processor unmapped.
    pub fn clear(&self) {
        let mut current = self.current.write();
        if current.is_some() {
            log::trace!("mapping register cleared");
        }
        *current = None;
    }

    /// Replace the current mapping, returning the previous one.
    pub fn swap(&self, mapping: Option<M>) -> Option<M> {
        let mut current = self.current.write();
        core::mem::replace(&mut *current, mapping)
    }

    /// Check whether anything is mapped.
    pub fn is_mapped(&self) -> bool {
        self.current.read().is_some()
    }
}

impl<M: Clone> Default for MappingRegister<M> {
    fn default() -> Self {
        Self::new()
    }
}
