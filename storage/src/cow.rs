//! Reference-counted copy-on-write cell over a payload of type `T`.
//!
//! Entries flow downward through storage layers unchanged; cloning an
//! `Entry` between layers must not copy its field vector until the child
//! layer actually modifies it. `CowCell` gives that for free on top of
//! `Arc`: cloning the cell is an `Arc` clone (an atomic increment), and
//! `mutable_get` only clones the payload when it finds itself sharing it
//! with another owner, the same "detach on write" idiom used for
//! copy-on-write state elsewhere in this ecosystem.

use std::sync::Arc;

#[derive(Debug)]
pub struct CowCell<T> {
    inner: Arc<T>,
}

impl<T: Clone> CowCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// A read view. Never breaks sharing.
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// A mutable view. Clones the payload iff it is currently shared with
    /// another `CowCell`; otherwise mutates the existing buffer in place.
    pub fn mutable_get(&mut self) -> &mut T {
        Arc::make_mut(&mut self.inner)
    }

    /// Number of `CowCell`s currently sharing this payload, including `self`.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: Clone> Clone for CowCell<T> {
    /// O(1): clones the `Arc`, never the payload.
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default> Default for CowCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
