//! Lazy Readers
//!
//! A lazy reader caches a value computed from other signals, keyed by the
//! identity of their values. Reading it again with an unchanged identity
//! returns the cached value without recomputing.
//!
//! Unlike data graph caches, a lazy reader lives inside the signal that
//! owns it, so it only saves work within a single pass (a signal that is
//! read several times, or that sits underneath several consumers).

use std::cell::RefCell;

use crate::error::Result;
use crate::id::{CapturedId, IdInterface};

/// A single cached value keyed by an input identity.
pub struct LazyReader<T> {
    cache: RefCell<Option<(CapturedId, T)>>,
}

impl<T> Default for LazyReader<T> {
    fn default() -> Self {
        Self {
            cache: RefCell::new(None),
        }
    }
}

/// Cloning yields an empty cache.
impl<T> Clone for LazyReader<T> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<T: Clone> LazyReader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value for `id`, computing it with `compute` if the cache holds
    /// nothing or a value for another identity.
    pub fn read(&self, id: &dyn IdInterface, compute: impl FnOnce() -> Result<T>) -> Result<T> {
        if let Some((cached_id, value)) = &*self.cache.borrow() {
            if cached_id.matches(id) {
                return Ok(value.clone());
            }
        }
        let value = compute()?;
        *self.cache.borrow_mut() = Some((CapturedId::new(id), value.clone()));
        Ok(value)
    }

    /// Forget the cached value.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }
}
