// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolution context for the five-tier precedence chain.
//!
//! This module provides [`ResolveCx`], which bundles the registry and a view
//! of the element tree ([`ValueTiers`]) and resolves effective values:
//!
//! **Binding → Local → Style → Inherited → Default**

use understory_property::{
    ErasedValue, Property, PropertyError, PropertyId, PropertyRegistry, PropertyValue,
};

/// Where an effective value came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueSource<K> {
    /// The element's attached binding.
    Binding,
    /// The element's own local value.
    Local,
    /// The element's resolved style (or its based-on chain).
    Style,
    /// The local or style tier of the given ancestor.
    Inherited(K),
    /// The registered default.
    Default,
}

/// Per-element tier lookups used by resolution.
///
/// `K` identifies an element. Implementations only report what an element
/// holds directly; the precedence walk lives in [`ResolveCx`].
pub trait ValueTiers<K: Copy> {
    /// Returns the last value pushed by the binding attached to `(key, id)`.
    fn binding_value(&self, key: K, id: PropertyId) -> Option<&ErasedValue>;

    /// Returns the element's local value.
    fn local_value(&self, key: K, id: PropertyId) -> Option<&ErasedValue>;

    /// Returns the value supplied by the element's resolved style.
    fn style_value(&self, key: K, id: PropertyId) -> Option<&ErasedValue>;

    /// Returns the element's parent.
    fn parent(&self, key: K) -> Option<K>;
}

/// Resolution context bundling the registry and the tier lookups.
///
/// # Example
///
/// ```rust
/// use understory_property::{ErasedValue, PropertyId, PropertyMetadataBuilder, PropertyRegistry};
/// use understory_style::{ResolveCx, ValueSource, ValueTiers};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let font_size = registry
///     .register(
///         "FontSize",
///         element,
///         PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
///     )
///     .unwrap();
///
/// // Two elements: 0 is the root with a local font size, 1 is its child.
/// struct Pair(ErasedValue);
///
/// impl ValueTiers<u32> for Pair {
///     fn binding_value(&self, _: u32, _: PropertyId) -> Option<&ErasedValue> { None }
///     fn local_value(&self, key: u32, _: PropertyId) -> Option<&ErasedValue> {
///         (key == 0).then_some(&self.0)
///     }
///     fn style_value(&self, _: u32, _: PropertyId) -> Option<&ErasedValue> { None }
///     fn parent(&self, key: u32) -> Option<u32> { (key == 1).then_some(0) }
/// }
///
/// let tiers = Pair(ErasedValue::new(20.0_f64));
/// let cx = ResolveCx::new(&registry, &tiers);
///
/// assert_eq!(cx.get_value(1, font_size), Ok(20.0));
/// assert_eq!(cx.value_source(1, font_size.id()), Ok(ValueSource::Inherited(0)));
/// ```
pub struct ResolveCx<'a, K, S: ?Sized> {
    registry: &'a PropertyRegistry,
    tiers: &'a S,
    _marker: core::marker::PhantomData<fn() -> K>,
}

impl<K, S: ?Sized> core::fmt::Debug for ResolveCx<'_, K, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResolveCx")
            .field("registry", &self.registry)
            .field("tiers", &core::any::type_name::<S>())
            .finish()
    }
}

impl<'a, K, S> ResolveCx<'a, K, S>
where
    K: Copy,
    S: ValueTiers<K> + ?Sized,
{
    /// Creates a new resolution context.
    pub fn new(registry: &'a PropertyRegistry, tiers: &'a S) -> Self {
        Self {
            registry,
            tiers,
            _marker: core::marker::PhantomData,
        }
    }

    /// Returns a reference to the property registry.
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &'a PropertyRegistry {
        self.registry
    }

    /// Resolves the effective value of `id` on `key` and reports its source.
    ///
    /// Precedence (highest to lowest):
    /// 1. The element's binding
    /// 2. The element's local value
    /// 3. The element's style (including its based-on chain)
    /// 4. If the property inherits: each ancestor's local value, then that
    ///    ancestor's style, nearest ancestor first
    /// 5. The registered default
    ///
    /// Ancestors' bindings are not consulted, and an ancestor's own inherited
    /// value is never reused; the walk re-reads raw tiers at every level.
    ///
    /// Style entries whose type is not the registered type are skipped, so a
    /// mistyped setter falls through to the next tier instead of failing
    /// every read.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if `id` is not registered.
    pub fn resolve(
        &self,
        key: K,
        id: PropertyId,
    ) -> Result<(&'a ErasedValue, ValueSource<K>), PropertyError> {
        let registration = self.registry.registration(id)?;

        if let Some(value) = self.tiers.binding_value(key, id) {
            return Ok((value, ValueSource::Binding));
        }
        if let Some(value) = self.tiers.local_value(key, id) {
            return Ok((value, ValueSource::Local));
        }
        let style_value = |key: K| {
            self.tiers
                .style_value(key, id)
                .filter(|value| value.type_id() == registration.type_id())
        };
        if let Some(value) = style_value(key) {
            return Ok((value, ValueSource::Style));
        }
        if registration.inherits() {
            let mut ancestor = self.tiers.parent(key);
            while let Some(current) = ancestor {
                if let Some(value) = self
                    .tiers
                    .local_value(current, id)
                    .or_else(|| style_value(current))
                {
                    return Ok((value, ValueSource::Inherited(current)));
                }
                ancestor = self.tiers.parent(current);
            }
        }
        Ok((registration.default_value(), ValueSource::Default))
    }

    /// Resolves the effective erased value of `id` on `key`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if `id` is not registered.
    pub fn get_erased(&self, key: K, id: PropertyId) -> Result<&'a ErasedValue, PropertyError> {
        self.resolve(key, id).map(|(value, _)| value)
    }

    /// Reports which tier supplies the effective value of `id` on `key`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if `id` is not registered.
    pub fn value_source(&self, key: K, id: PropertyId) -> Result<ValueSource<K>, PropertyError> {
        self.resolve(key, id).map(|(_, source)| source)
    }

    /// Resolves the effective value of a typed property.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if the property is not registered,
    /// [`PropertyError::TypeMismatch`] if `T` is not its registered type.
    pub fn get_value<T: PropertyValue>(
        &self,
        key: K,
        property: Property<T>,
    ) -> Result<T, PropertyError> {
        self.registry.check_type(property)?;
        let value = self.get_erased(key, property.id())?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| PropertyError::TypeMismatch {
                property: property.id(),
                expected: core::any::type_name::<T>(),
                found: value.type_name(),
            })
    }
}
