// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value-push bindings.
//!
//! A [`Binding`] supplies the top resolution tier for one `(element, property)`
//! pair. Bindings do not know about the tree: they report changes through a
//! [`ChangeNotifier`] handed to them on attach, and the tree pulls the new
//! value when it processes the notification.
//!
//! [`BindingSource`] is a small shared cell that most callers can use instead
//! of implementing [`Binding`] by hand:
//!
//! ```rust
//! use understory_property::{Binding, BindingMode, BindingSource};
//!
//! let source = BindingSource::new(5_i32);
//! let one_way = source.one_way();
//! let two_way = source.two_way();
//!
//! assert_eq!(one_way.mode(), BindingMode::OneWay);
//! assert!(!one_way.write(6));
//!
//! assert!(two_way.write(7));
//! assert_eq!(source.get(), 7);
//! assert_eq!(one_way.value(), 7);
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use crate::value::{ErasedValue, PropertyValue};

/// Direction of data flow for a binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// Source to target only. Writes to the bound property fail.
    OneWay,
    /// Source to target, with writes to the bound property redirected into
    /// the source.
    TwoWay,
}

/// Callback a binding invokes when its value changes.
///
/// [`notify`](Self::notify) returns `false` once the receiver has gone away;
/// bindings should drop such notifiers.
pub struct ChangeNotifier(Box<dyn Fn() -> bool>);

impl ChangeNotifier {
    /// Wraps a notification callback.
    pub fn new(callback: impl Fn() -> bool + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// Delivers a change notification.
    ///
    /// Returns `false` if the receiver is gone and this notifier can be
    /// discarded.
    #[inline]
    pub fn notify(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier").finish_non_exhaustive()
    }
}

/// A live value source for one bound property.
pub trait Binding<T: PropertyValue> {
    /// Returns the current value.
    fn value(&self) -> T;

    /// Returns the binding's direction.
    fn mode(&self) -> BindingMode;

    /// Writes a value back into the source.
    ///
    /// Returns `false` if the binding does not accept writes, which the tree
    /// reports as `NotTwoWay`. A source that changes as a result must notify
    /// its subscribers; the bound property updates when that notification is
    /// processed.
    fn write(&self, value: T) -> bool {
        let _ = value;
        false
    }

    /// Registers a notifier to be called whenever [`value`](Self::value)
    /// changes.
    fn subscribe(&self, notifier: ChangeNotifier);
}

/// A binding with its value type erased, as stored by element trees.
pub struct ErasedBinding {
    inner: Box<dyn ErasedBindingTrait>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedBinding {
    /// Erases a typed binding.
    pub fn new<T, B>(binding: B) -> Self
    where
        T: PropertyValue,
        B: Binding<T> + 'static,
    {
        Self {
            inner: Box::new(Typed {
                binding,
                _marker: PhantomData::<fn() -> T>,
            }),
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the bound value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the bound value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the binding's current value.
    #[must_use]
    pub fn value(&self) -> ErasedValue {
        self.inner.value()
    }

    /// Returns the binding's direction.
    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.inner.mode()
    }

    /// Writes an erased value into the source.
    ///
    /// Returns `false` if the binding refuses the write or the value has the
    /// wrong type.
    pub fn write(&self, value: &ErasedValue) -> bool {
        self.inner.write(value)
    }

    /// Registers a change notifier with the underlying binding.
    pub fn subscribe(&self, notifier: ChangeNotifier) {
        self.inner.subscribe(notifier);
    }
}

impl fmt::Debug for ErasedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBinding")
            .field("type", &self.type_name)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

trait ErasedBindingTrait {
    fn value(&self) -> ErasedValue;
    fn mode(&self) -> BindingMode;
    fn write(&self, value: &ErasedValue) -> bool;
    fn subscribe(&self, notifier: ChangeNotifier);
}

struct Typed<T, B> {
    binding: B,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PropertyValue, B: Binding<T>> ErasedBindingTrait for Typed<T, B> {
    fn value(&self) -> ErasedValue {
        ErasedValue::new(self.binding.value())
    }

    fn mode(&self) -> BindingMode {
        self.binding.mode()
    }

    fn write(&self, value: &ErasedValue) -> bool {
        value
            .downcast_ref::<T>()
            .is_some_and(|v| self.binding.write(v.clone()))
    }

    fn subscribe(&self, notifier: ChangeNotifier) {
        self.binding.subscribe(notifier);
    }
}

/// A shared, observable value cell.
///
/// Clones share the same value. [`set`](Self::set) notifies every subscribed
/// binding when the value actually changes.
pub struct BindingSource<T> {
    inner: Rc<SourceInner<T>>,
}

struct SourceInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<ChangeNotifier>>,
}

impl<T: PropertyValue> BindingSource<T> {
    /// Creates a source holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SourceInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replaces the value, notifying subscribers if it changed.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        // Notifiers subscribed while notifying land in `fresh` and are kept.
        let subscribers = core::mem::take(&mut *self.inner.subscribers.borrow_mut());
        let mut live: Vec<_> = subscribers.into_iter().filter(|n| n.notify()).collect();
        let mut subs = self.inner.subscribers.borrow_mut();
        let fresh = core::mem::take(&mut *subs);
        live.extend(fresh);
        *subs = live;
        true
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Creates a read-only binding to this source.
    #[must_use]
    pub fn one_way(&self) -> SourceBinding<T> {
        SourceBinding {
            source: self.clone(),
            mode: BindingMode::OneWay,
        }
    }

    /// Creates a binding that also writes back into this source.
    #[must_use]
    pub fn two_way(&self) -> SourceBinding<T> {
        SourceBinding {
            source: self.clone(),
            mode: BindingMode::TwoWay,
        }
    }
}

impl<T> Clone for BindingSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BindingSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSource")
            .field("value", &self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

/// A [`Binding`] reading from a [`BindingSource`].
#[derive(Clone, Debug)]
pub struct SourceBinding<T> {
    source: BindingSource<T>,
    mode: BindingMode,
}

impl<T: PropertyValue> Binding<T> for SourceBinding<T> {
    fn value(&self) -> T {
        self.source.get()
    }

    fn mode(&self) -> BindingMode {
        self.mode
    }

    fn write(&self, value: T) -> bool {
        match self.mode {
            BindingMode::TwoWay => {
                self.source.set(value);
                true
            }
            BindingMode::OneWay => false,
        }
    }

    fn subscribe(&self, notifier: ChangeNotifier) {
        self.source.inner.subscribers.borrow_mut().push(notifier);
    }
}
