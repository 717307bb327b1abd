// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A lazily computed, explicitly invalidated cache cell.

use core::cell::OnceCell;
use core::fmt;

/// A cached value guarded by its own validity.
///
/// An empty cell is *invalid* (pending recompute). Reads through
/// [`get_or_compute`](Self::get_or_compute) fill it through a shared
/// reference, which lets derived data such as world transforms be computed
/// on first read without a mutable borrow of the whole tree. Invalidation
/// needs `&mut` and is the only way a valid value is discarded.
///
/// ```rust
/// use understory_element::Cached;
///
/// let mut cell = Cached::new();
/// assert!(!cell.is_valid());
/// assert_eq!(*cell.get_or_compute(|| 4), 4);
/// // Valid cells do not recompute.
/// assert_eq!(*cell.get_or_compute(|| 5), 4);
///
/// assert!(cell.invalidate());
/// assert!(!cell.invalidate());
/// assert_eq!(*cell.get_or_compute(|| 5), 5);
/// ```
pub struct Cached<T> {
    cell: OnceCell<T>,
}

impl<T> Cached<T> {
    /// Creates an invalid (pending) cell.
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns `true` if the cell holds a value.
    #[must_use]
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the cached value, if valid.
    #[must_use]
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns the cached value, computing and storing it first if the cell
    /// is invalid.
    #[inline]
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(compute)
    }

    /// Stores a freshly computed value, making the cell valid.
    #[inline]
    pub fn set(&mut self, value: T) {
        self.cell = OnceCell::from(value);
    }

    /// Discards the cached value.
    ///
    /// Returns `true` if the cell was valid, i.e. if this call changed state.
    #[inline]
    pub fn invalidate(&mut self) -> bool {
        self.cell.take().is_some()
    }

    /// Discards and returns the cached value.
    #[inline]
    pub fn take(&mut self) -> Option<T> {
        self.cell.take()
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Cached<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Cached").field(value).finish(),
            None => f.write_str("Cached(<pending>)"),
        }
    }
}
