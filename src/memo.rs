//! Compute-and-memoize cells for request-local caches.

use std::cell::RefCell;

/// A lazily computed value that stays cached until [`Memo::invalidate`] is called.
#[derive(Debug)]
pub struct Memo<T> {
    value: RefCell<Option<T>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            value: RefCell::new(None),
        }
    }
}

impl<T: Clone> Memo<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value, computing it with `init` first if the cell is empty.
    ///
    /// A failed computation leaves the cell empty.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.value.borrow().as_ref() {
            return Ok(value.clone());
        }
        let value = init()?;
        *self.value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Drops the cached value so the next access recomputes it.
    pub fn invalidate(&self) {
        *self.value.borrow_mut() = None;
    }
}
