//! Reusable payload boxes for recorded operations.

use std::sync::{Mutex, MutexGuard, PoisonError};

use inlay_common::Point;

use crate::host::CommandBuffer;

/// Free boxes kept per operation type.
pub(crate) const MAX_POOLED: usize = 64;

pub(crate) struct Pool<T> {
    free: Mutex<Vec<Box<T>>>,
}

impl<T: Default + Send + 'static> Pool<T> {
    pub(crate) const fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Stage `value` into `ops` behind a zero-area clip and input marker.
    pub(crate) fn add(&self, ops: &mut CommandBuffer, value: T) {
        let mut slot = self.lock().pop().unwrap_or_default();
        *slot = value;
        let clip = ops.push_clip(Point::ZERO);
        ops.add_input(slot);
        clip.pop(ops);
    }

    /// Reset a dispatched payload and keep its allocation.
    pub(crate) fn free(&self, mut value: Box<T>) {
        *value = T::default();
        let mut free = self.lock();
        if free.len() < MAX_POOLED {
            free.push(value);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<T>>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
