// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared style definitions.
//!
//! This module provides [`Style`], a shared collection of property setters
//! that can be referenced by multiple elements.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use understory_property::{
    ErasedValue, Property, PropertyError, PropertyId, PropertyRegistry, PropertyValue,
};

/// A shared, immutable collection of property setters.
///
/// Styles store property values once and can be shared across many elements.
/// This follows `WinUI`'s `OptimizedStyle` pattern for memory efficiency: rather
/// than storing style values per-element, elements hold a reference to a
/// shared style.
///
/// A style may be *based on* another style. Lookups that miss this style's
/// own setters continue along the based-on chain, and the same applies to
/// the attached renderer `R`.
///
/// Styles are immutable after creation. Use [`StyleBuilder`] to construct them.
///
/// # Memory Layout
///
/// Internally, `Style` wraps an `Rc<StyleData>`, making cloning cheap (just
/// incrementing a reference count). The actual property values are stored once
/// in a sorted vector, similar to `PropertyStore`.
///
/// # Example
///
/// ```rust
/// use understory_style::StyleBuilder;
/// use understory_property::{PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let width = registry
///     .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
/// let height = registry
///     .register("Height", element, PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// let base = StyleBuilder::<()>::new().set(width, 100.0).set(height, 20.0).build();
/// let tall = StyleBuilder::new().based_on(base.clone()).set(height, 60.0).build();
///
/// assert_eq!(tall.get(width), Some(&100.0));
/// assert_eq!(tall.get(height), Some(&60.0));
/// ```
pub struct Style<R> {
    inner: Rc<StyleData<R>>,
}

/// Internal storage for style property values.
struct StyleData<R> {
    /// Sorted by `PropertyId` for binary search lookup.
    entries: Vec<(PropertyId, ErasedValue)>,
    based_on: Option<Style<R>>,
    renderer: Option<R>,
}

impl<R> Style<R> {
    /// Returns `true` if this style has no property setters of its own.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns the number of property setters in this style, excluding the
    /// based-on chain.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Gets the erased value for a property from this style or its based-on
    /// chain.
    #[must_use]
    pub fn get_erased(&self, id: PropertyId) -> Option<&ErasedValue> {
        let mut style = self;
        loop {
            if let Ok(idx) = style
                .inner
                .entries
                .binary_search_by_key(&id, |(pid, _)| *pid)
            {
                return Some(&style.inner.entries[idx].1);
            }
            style = style.inner.based_on.as_ref()?;
        }
    }

    /// Gets the value for a property, if set in this style or its based-on
    /// chain.
    #[must_use]
    #[inline]
    pub fn get<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.get_erased(property.id())
            .and_then(ErasedValue::downcast_ref)
    }

    /// Returns `true` if this style or its based-on chain sets the property.
    #[must_use]
    #[inline]
    pub fn contains<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.get_erased(property.id()).is_some()
    }

    /// Returns an iterator over the property IDs set directly in this style.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.inner.entries.iter().map(|(id, _)| *id)
    }

    /// Returns the style this one is based on.
    #[must_use]
    #[inline]
    pub fn based_on(&self) -> Option<&Self> {
        self.inner.based_on.as_ref()
    }

    /// Returns the renderer attached to this style or, failing that, the
    /// nearest one along the based-on chain.
    #[must_use]
    pub fn renderer(&self) -> Option<&R> {
        let mut style = self;
        loop {
            if let Some(renderer) = &style.inner.renderer {
                return Some(renderer);
            }
            style = style.inner.based_on.as_ref()?;
        }
    }

    /// Returns `true` if both handles refer to the same style.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Clone for Style<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for Style<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Style")
            .field("entries", &self.inner.entries)
            .field("based_on", &self.inner.based_on)
            .field("has_renderer", &self.inner.renderer.is_some())
            .finish()
    }
}

/// Builder for constructing [`Style`] instances.
///
/// # Example
///
/// ```rust
/// use understory_style::StyleBuilder;
/// use understory_property::{PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let width = registry
///     .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// // The last setter for a property wins.
/// let style = StyleBuilder::new()
///     .set(width, 100.0)
///     .set(width, 50.0)
///     .renderer("flat")
///     .build();
///
/// assert_eq!(style.get(width), Some(&50.0));
/// assert_eq!(style.renderer(), Some(&"flat"));
/// ```
pub struct StyleBuilder<R> {
    entries: Vec<(PropertyId, ErasedValue)>,
    based_on: Option<Style<R>>,
    renderer: Option<R>,
}

impl<R> Default for StyleBuilder<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            based_on: None,
            renderer: None,
        }
    }
}

impl<R> fmt::Debug for StyleBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleBuilder")
            .field("entries", &self.entries)
            .field("based_on", &self.based_on)
            .field("has_renderer", &self.renderer.is_some())
            .finish()
    }
}

impl<R> StyleBuilder<R> {
    /// Creates a new empty style builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the style to fall back to for properties this style does not set.
    #[must_use]
    pub fn based_on(mut self, style: Style<R>) -> Self {
        self.based_on = Some(style);
        self
    }

    /// Attaches a renderer to the style.
    #[must_use]
    pub fn renderer(mut self, renderer: R) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets a property value in the style.
    ///
    /// If the property was already set, the value is replaced.
    #[must_use]
    pub fn set<T: PropertyValue>(self, property: Property<T>, value: T) -> Self {
        self.set_erased(property.id(), ErasedValue::new(value))
    }

    /// Sets an already-erased property value in the style.
    ///
    /// The value's type is not checked here. Use
    /// [`build_checked`](Self::build_checked) to reject mistyped setters;
    /// value resolution skips any that reach a built style.
    #[must_use]
    pub fn set_erased(mut self, id: PropertyId, value: ErasedValue) -> Self {
        match self.entries.binary_search_by_key(&id, |(pid, _)| *pid) {
            Ok(idx) => {
                self.entries[idx].1 = value;
            }
            Err(idx) => {
                self.entries.insert(idx, (id, value));
            }
        }
        self
    }

    /// Builds the style.
    #[must_use]
    pub fn build(self) -> Style<R> {
        Style {
            inner: Rc::new(StyleData {
                entries: self.entries,
                based_on: self.based_on,
                renderer: self.renderer,
            }),
        }
    }

    /// Builds the style after checking every setter against `registry`.
    ///
    /// Values go through the property's coerce callback, as local and
    /// binding values do. Setters inherited through the based-on style are
    /// not re-checked.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] or [`PropertyError::TypeMismatch`]
    /// for the first setter that does not match its registration.
    pub fn build_checked(
        mut self,
        registry: &PropertyRegistry,
    ) -> Result<Style<R>, PropertyError> {
        for (id, value) in &mut self.entries {
            registry.check_value(*id, value)?;
            let coerced = registry.registration(*id)?.coerce(value.clone());
            *value = coerced;
        }
        Ok(self.build())
    }
}
