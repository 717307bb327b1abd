// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata definitions.
//!
//! This module provides [`PropertyMetadata`] for storing property configuration
//! and [`PropertyMetadataBuilder`] for ergonomic construction.

use alloc::boxed::Box;
use core::any::Any;

use crate::invalidation::Invalidation;
use crate::value::{ErasedValue, PropertyValue};

/// Callback invoked when a property's effective value changes.
///
/// The callback receives the old and new effective values and returns the
/// caches the change invalidates on the element. The result is unioned with
/// the metadata's declarative [`affects`](PropertyMetadata::affects) set.
pub type PropertyChangedCallback<T> = Box<dyn Fn(&T, &T) -> Invalidation + Send + Sync>;

/// Callback for coercing a property value before it's stored.
///
/// This can be used to clamp values, validate ranges, etc.
/// The callback receives the proposed value and returns the coerced value.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Metadata for a dependency property.
///
/// This contains the configuration for a property including its default value,
/// whether it inherits, whether it is attached, which caches it invalidates,
/// and optional callbacks.
///
/// # Example
///
/// ```rust
/// use understory_property::{Invalidation, PropertyMetadataBuilder};
///
/// let metadata = PropertyMetadataBuilder::new(12.0_f64)
///     .inherits(true)
///     .affects(Invalidation::MEASURE)
///     .build();
///
/// assert_eq!(metadata.default_value(), &12.0);
/// assert!(metadata.inherits());
/// assert_eq!(metadata.affects(), Invalidation::MEASURE);
/// ```
pub struct PropertyMetadata<T: PropertyValue> {
    default_value: T,
    inherits: bool,
    attached: bool,
    affects: Invalidation,
    changed_callback: Option<PropertyChangedCallback<T>>,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: PropertyValue> PropertyMetadata<T> {
    /// Creates new property metadata with the given default value.
    ///
    /// All other fields use their defaults:
    /// - `inherits`: `false`
    /// - `attached`: `false`
    /// - `affects`: empty
    /// - `changed_callback`: `None`
    /// - `coerce_callback`: `None`
    #[must_use]
    pub fn new(default_value: T) -> Self {
        PropertyMetadataBuilder::new(default_value).build()
    }

    /// Returns a reference to the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Returns whether this property inherits from ancestor elements.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.inherits
    }

    /// Returns whether this property is attached: declared by one kind but
    /// meaningful on elements of any kind (for example a docking side read by
    /// a parent container).
    #[must_use]
    #[inline]
    pub fn attached(&self) -> bool {
        self.attached
    }

    /// Returns the caches every change to this property invalidates.
    #[must_use]
    #[inline]
    pub fn affects(&self) -> Invalidation {
        self.affects
    }

    /// Invokes the changed callback if one is set.
    ///
    /// Returns the callback's invalidation set, or an empty set without one.
    #[inline]
    pub fn on_changed(&self, old_value: &T, new_value: &T) -> Invalidation {
        match &self.changed_callback {
            Some(callback) => callback(old_value, new_value),
            None => Invalidation::empty(),
        }
    }

    /// Coerces a value using the coerce callback if one is set.
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        if let Some(callback) = &self.coerce_callback {
            callback(value)
        } else {
            value
        }
    }

    /// Returns whether a changed callback is set.
    #[must_use]
    #[inline]
    pub fn has_changed_callback(&self) -> bool {
        self.changed_callback.is_some()
    }

    /// Returns whether a coerce callback is set.
    #[must_use]
    #[inline]
    pub fn has_coerce_callback(&self) -> bool {
        self.coerce_callback.is_some()
    }
}

impl<T: PropertyValue + core::fmt::Debug> core::fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("inherits", &self.inherits)
            .field("attached", &self.attached)
            .field("affects", &self.affects)
            .field("has_changed_callback", &self.changed_callback.is_some())
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
///
/// # Example
///
/// ```rust
/// use understory_property::{Invalidation, PropertyMetadataBuilder};
///
/// let metadata = PropertyMetadataBuilder::new(1.0_f64)
///     .coerce(|v: f64| v.clamp(0.0, 1.0))
///     .on_changed(|old: &f64, new: &f64| {
///         if (old - new).abs() > 0.5 {
///             Invalidation::PAINT_RESOURCES
///         } else {
///             Invalidation::empty()
///         }
///     })
///     .build();
///
/// assert_eq!(metadata.coerce(4.0), 1.0);
/// assert_eq!(metadata.on_changed(&0.0, &1.0), Invalidation::PAINT_RESOURCES);
/// ```
pub struct PropertyMetadataBuilder<T: PropertyValue> {
    default_value: T,
    inherits: bool,
    attached: bool,
    affects: Invalidation,
    changed_callback: Option<PropertyChangedCallback<T>>,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: PropertyValue + core::fmt::Debug> core::fmt::Debug for PropertyMetadataBuilder<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("default_value", &self.default_value)
            .field("inherits", &self.inherits)
            .field("attached", &self.attached)
            .field("affects", &self.affects)
            .finish_non_exhaustive()
    }
}

impl<T: PropertyValue> PropertyMetadataBuilder<T> {
    /// Creates a new builder with the given default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            inherits: false,
            attached: false,
            affects: Invalidation::empty(),
            changed_callback: None,
            coerce_callback: None,
        }
    }

    /// Sets whether this property inherits from ancestor elements.
    ///
    /// An inheriting property with no binding, local or style value on an
    /// element takes the nearest ancestor's local or style value.
    #[must_use]
    pub fn inherits(mut self, inherits: bool) -> Self {
        self.inherits = inherits;
        self
    }

    /// Marks this property as attached.
    #[must_use]
    pub fn attached(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }

    /// Sets the caches every change to this property invalidates.
    #[must_use]
    pub fn affects(mut self, affects: Invalidation) -> Self {
        self.affects = affects;
        self
    }

    /// Sets a callback to be invoked when the property's effective value changes.
    #[must_use]
    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T, &T) -> Invalidation + Send + Sync + 'static,
    {
        self.changed_callback = Some(Box::new(callback));
        self
    }

    /// Sets a callback to coerce values before they are stored.
    #[must_use]
    pub fn coerce<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.coerce_callback = Some(Box::new(callback));
        self
    }

    /// Builds the [`PropertyMetadata`].
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        PropertyMetadata {
            default_value: self.default_value,
            inherits: self.inherits,
            attached: self.attached,
            affects: self.affects,
            changed_callback: self.changed_callback,
            coerce_callback: self.coerce_callback,
        }
    }
}

/// Metadata with its value type erased, as held by the registry.
pub(crate) trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn inherits(&self) -> bool;
    fn attached(&self) -> bool;
    fn affects(&self) -> Invalidation;
    fn default_erased(&self) -> ErasedValue;
    /// Coerces `value`; values of a foreign type are returned untouched.
    fn coerce_erased(&self, value: ErasedValue) -> ErasedValue;
    /// Runs the change callback; values of a foreign type invalidate nothing.
    fn changed_erased(&self, old: &ErasedValue, new: &ErasedValue) -> Invalidation;
}

impl<T: PropertyValue> ErasedMetadata for PropertyMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn inherits(&self) -> bool {
        self.inherits
    }

    fn attached(&self) -> bool {
        self.attached
    }

    fn affects(&self) -> Invalidation {
        self.affects
    }

    fn default_erased(&self) -> ErasedValue {
        ErasedValue::new(self.default_value.clone())
    }

    fn coerce_erased(&self, value: ErasedValue) -> ErasedValue {
        match (&self.coerce_callback, value.downcast_ref::<T>()) {
            (Some(callback), Some(typed)) => ErasedValue::new(callback(typed.clone())),
            _ => value,
        }
    }

    fn changed_erased(&self, old: &ErasedValue, new: &ErasedValue) -> Invalidation {
        match (old.downcast_ref::<T>(), new.downcast_ref::<T>()) {
            (Some(old), Some(new)) => self.on_changed(old, new),
            _ => Invalidation::empty(),
        }
    }
}

impl dyn ErasedMetadata {
    pub(crate) fn downcast_ref<T: PropertyValue>(&self) -> Option<&PropertyMetadata<T>> {
        self.as_any().downcast_ref()
    }
}
