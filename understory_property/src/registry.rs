// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property and kind registry.
//!
//! This module provides [`PropertyRegistry`] for registering element kinds and
//! properties, and for looking up property metadata.
//!
//! The registry is built during a setup phase through `&mut self` and then
//! handed to element trees, which keep it behind an `Rc`. Once shared, no
//! further registration is possible, so reads never need a lock.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::TypeId;
use hashbrown::HashMap;

use crate::error::PropertyError;
use crate::id::{KindId, Property, PropertyId};
use crate::invalidation::Invalidation;
use crate::metadata::{ErasedMetadata, PropertyMetadata};
use crate::value::{ErasedValue, PropertyValue};

/// A registration entry for an element kind.
#[derive(Clone, Debug)]
pub struct KindRegistration {
    name: &'static str,
    base: Option<KindId>,
}

impl KindRegistration {
    /// Returns the kind name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the base kind, if any.
    #[must_use]
    #[inline]
    pub fn base(&self) -> Option<KindId> {
        self.base
    }
}

/// A registration entry for a property.
///
/// This stores the property's identity, type information, and metadata.
pub struct PropertyRegistration {
    name: &'static str,
    owner: KindId,
    type_id: TypeId,
    type_name: &'static str,
    default: ErasedValue,
    metadata: Box<dyn ErasedMetadata>,
}

impl PropertyRegistration {
    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the kind that declared the property.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> KindId {
        self.owner
    }

    /// Returns the [`TypeId`] of the property's value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the property's value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the registered default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &ErasedValue {
        &self.default
    }

    /// Returns the caches every change to this property invalidates.
    #[must_use]
    #[inline]
    pub fn affects(&self) -> Invalidation {
        self.metadata.affects()
    }

    /// Returns whether this property inherits from ancestors.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.metadata.inherits()
    }

    /// Returns whether this property is attached.
    #[must_use]
    #[inline]
    pub fn attached(&self) -> bool {
        self.metadata.attached()
    }

    /// Applies the coerce callback to an erased value.
    #[must_use]
    pub fn coerce(&self, value: ErasedValue) -> ErasedValue {
        self.metadata.coerce_erased(value)
    }

    /// Returns the invalidations for an effective-value change from `old` to
    /// `new`: the declarative [`affects`](Self::affects) set unioned with the
    /// change callback's result.
    #[must_use]
    pub fn changed(&self, old: &ErasedValue, new: &ErasedValue) -> Invalidation {
        self.metadata.affects() | self.metadata.changed_erased(old, new)
    }

    fn check(
        &self,
        id: PropertyId,
        type_id: TypeId,
        found: &'static str,
    ) -> Result<(), PropertyError> {
        if self.type_id == type_id {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch {
                property: id,
                expected: self.type_name,
                found,
            })
        }
    }
}

impl core::fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("type", &self.type_name)
            .field("inherits", &self.inherits())
            .field("attached", &self.attached())
            .field("affects", &self.affects())
            .finish_non_exhaustive()
    }
}

/// A registry for element kinds and dependency properties.
///
/// Kinds are registered with an optional base kind, forming the runtime kind
/// hierarchy used by style lookup. Properties are keyed by `(owner, name)`.
///
/// # Example
///
/// ```rust
/// use understory_property::{Invalidation, PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let button = registry.register_kind("Button", Some(element)).unwrap();
///
/// let width = registry
///     .register(
///         "Width",
///         element,
///         PropertyMetadataBuilder::new(0.0_f64)
///             .affects(Invalidation::MEASURE)
///             .build(),
///     )
///     .unwrap();
///
/// assert_eq!(registry.name(width.id()), Some("Width"));
/// assert_eq!(registry.lookup(element, "Width"), Some(width.id()));
/// assert!(registry.is_kind_of(button, element));
///
/// // The same (owner, name) pair cannot be registered twice.
/// assert!(registry
///     .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
///     .is_err());
/// ```
#[derive(Default)]
pub struct PropertyRegistry {
    kinds: Vec<KindRegistration>,
    kinds_by_name: HashMap<&'static str, KindId>,
    properties: Vec<PropertyRegistration>,
    by_owner: HashMap<KindId, HashMap<&'static str, PropertyId>>,
}

impl PropertyRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element kind deriving from `base`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::DuplicateRegistration`] if the name is taken and
    /// [`PropertyError::UnknownKind`] if `base` is not registered.
    ///
    /// # Panics
    ///
    /// Panics if more than 65,535 kinds are registered.
    pub fn register_kind(
        &mut self,
        name: &'static str,
        base: Option<KindId>,
    ) -> Result<KindId, PropertyError> {
        if self.kinds_by_name.contains_key(name) {
            return Err(PropertyError::DuplicateRegistration { owner: None, name });
        }
        if let Some(base) = base {
            self.kind(base)?;
        }
        assert!(
            self.kinds.len() < u16::MAX as usize,
            "Too many kinds registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = KindId::new(self.kinds.len() as u16);
        self.kinds.push(KindRegistration { name, base });
        self.kinds_by_name.insert(name, id);
        tracing::trace!(kind = name, ?id, ?base, "registered kind");
        Ok(id)
    }

    /// Registers a new property owned by `owner`.
    ///
    /// Returns a type-safe [`Property<T>`] handle for accessing the property.
    ///
    /// # Errors
    ///
    /// [`PropertyError::DuplicateRegistration`] if `owner` already declares a
    /// property with this name and [`PropertyError::UnknownKind`] if `owner`
    /// is not registered.
    ///
    /// # Panics
    ///
    /// Panics if more than 65,535 properties are registered.
    pub fn register<T: PropertyValue>(
        &mut self,
        name: &'static str,
        owner: KindId,
        metadata: PropertyMetadata<T>,
    ) -> Result<Property<T>, PropertyError> {
        self.kind(owner)?;
        if self.lookup(owner, name).is_some() {
            return Err(PropertyError::DuplicateRegistration {
                owner: Some(owner),
                name,
            });
        }
        assert!(
            self.properties.len() < u16::MAX as usize,
            "Too many properties registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = PropertyId::new(self.properties.len() as u16);

        self.properties.push(PropertyRegistration {
            name,
            owner,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            default: ErasedValue::new(metadata.default_value().clone()),
            metadata: Box::new(metadata),
        });
        self.by_owner.entry(owner).or_default().insert(name, id);
        tracing::trace!(property = name, ?id, ?owner, "registered property");

        Ok(Property::from_id(id))
    }

    /// Returns the number of registered properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no properties are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns the number of registered kinds.
    #[must_use]
    #[inline]
    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }

    // =========================================================================
    // Kinds
    // =========================================================================

    /// Returns the registration for a kind.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownKind`] if the kind is not registered.
    pub fn kind(&self, id: KindId) -> Result<&KindRegistration, PropertyError> {
        self.kinds
            .get(id.index() as usize)
            .ok_or(PropertyError::UnknownKind(id))
    }

    /// Looks up a kind by name.
    #[must_use]
    pub fn kind_by_name(&self, name: &str) -> Option<KindId> {
        self.kinds_by_name.get(name).copied()
    }

    /// Returns the name of a kind.
    #[must_use]
    pub fn kind_name(&self, id: KindId) -> Option<&'static str> {
        self.kinds.get(id.index() as usize).map(KindRegistration::name)
    }

    /// Returns the base of a kind, if it has one.
    #[must_use]
    pub fn kind_base(&self, id: KindId) -> Option<KindId> {
        self.kinds.get(id.index() as usize).and_then(KindRegistration::base)
    }

    /// Iterates `kind` followed by each of its base kinds, most derived first.
    ///
    /// Unknown kinds yield nothing.
    pub fn kind_ancestors(&self, kind: KindId) -> impl Iterator<Item = KindId> + '_ {
        let first = self.kinds.get(kind.index() as usize).map(|_| kind);
        core::iter::successors(first, move |k| self.kind_base(*k))
    }

    /// Returns `true` if `kind` is `base` or derives from it.
    #[must_use]
    pub fn is_kind_of(&self, kind: KindId, base: KindId) -> bool {
        self.kind_ancestors(kind).any(|k| k == base)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Looks up a property by its `(owner, name)` identity.
    #[must_use]
    pub fn lookup(&self, owner: KindId, name: &str) -> Option<PropertyId> {
        self.by_owner.get(&owner)?.get(name).copied()
    }

    /// Returns the name of a property.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.properties.get(id.index() as usize).map(|r| r.name)
    }

    /// Returns the owning kind of a property.
    #[must_use]
    pub fn owner(&self, id: PropertyId) -> Option<KindId> {
        self.properties.get(id.index() as usize).map(|r| r.owner)
    }

    /// Returns the registration for a property.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyRegistration> {
        self.properties.get(id.index() as usize)
    }

    /// Returns the registration for a property, or an error if unknown.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if the id is not registered.
    pub fn registration(&self, id: PropertyId) -> Result<&PropertyRegistration, PropertyError> {
        self.get(id).ok_or(PropertyError::UnknownProperty(id))
    }

    /// Returns the caches a property invalidates on every change.
    #[must_use]
    pub fn affects(&self, id: PropertyId) -> Invalidation {
        self.get(id).map(|r| r.affects()).unwrap_or_default()
    }

    /// Returns whether a property inherits from ancestors.
    #[must_use]
    pub fn inherits(&self, id: PropertyId) -> bool {
        self.get(id).is_some_and(|r| r.inherits())
    }

    /// Returns the metadata for a typed property.
    ///
    /// Returns `None` if the property is not registered or the type doesn't match.
    #[must_use]
    pub fn get_metadata<T: PropertyValue>(
        &self,
        property: Property<T>,
    ) -> Option<&PropertyMetadata<T>> {
        self.get(property.id())
            .and_then(|r| r.metadata.downcast_ref())
    }

    /// Checks that a typed handle matches the registered value type.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] or [`PropertyError::TypeMismatch`].
    pub fn check_type<T: PropertyValue>(&self, property: Property<T>) -> Result<(), PropertyError> {
        let id = property.id();
        self.registration(id)?
            .check(id, TypeId::of::<T>(), core::any::type_name::<T>())
    }

    /// Checks that an erased value matches a property's registered type.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] or [`PropertyError::TypeMismatch`].
    pub fn check_value(&self, id: PropertyId, value: &ErasedValue) -> Result<(), PropertyError> {
        self.registration(id)?
            .check(id, value.type_id(), value.type_name())
    }

    /// Returns an iterator over all registered properties.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyRegistration)> {
        self.properties.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (PropertyId::new(i as u16), r)
        })
    }
}

impl core::fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("kinds", &self.kinds.iter().map(|k| k.name).collect::<Vec<_>>())
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use alloc::{format, vec, vec::Vec};

    fn with_element() -> (PropertyRegistry, KindId) {
        let mut registry = PropertyRegistry::new();
        let element = registry.register_kind("Element", None).unwrap();
        (registry, element)
    }

    #[test]
    fn registry_new() {
        let registry = PropertyRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.kind_count(), 0);
    }

    #[test]
    fn registry_register() {
        let (mut registry, element) = with_element();

        let width = registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(width.id().index(), 0);
        assert_eq!(registry.owner(width.id()), Some(element));
        assert_eq!(registry.get(width.id()).unwrap().type_name(), "f64");
    }

    #[test]
    fn duplicate_property_is_an_error() {
        let (mut registry, element) = with_element();
        registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let err = registry
            .register("Width", element, PropertyMetadataBuilder::new(1_i32).build())
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::DuplicateRegistration {
                owner: Some(element),
                name: "Width"
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_on_different_owners() {
        let (mut registry, element) = with_element();
        let panel = registry.register_kind("Panel", Some(element)).unwrap();

        let a = registry
            .register("Spacing", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let b = registry
            .register("Spacing", panel, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.lookup(element, "Spacing"), Some(a.id()));
        assert_eq!(registry.lookup(panel, "Spacing"), Some(b.id()));
    }

    #[test]
    fn unknown_owner_is_an_error() {
        let mut registry = PropertyRegistry::new();
        let err = registry
            .register("Width", KindId::new(7), PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap_err();
        assert_eq!(err, PropertyError::UnknownKind(KindId::new(7)));
    }

    #[test]
    fn kind_hierarchy() {
        let (mut registry, element) = with_element();
        let control = registry.register_kind("Control", Some(element)).unwrap();
        let button = registry.register_kind("Button", Some(control)).unwrap();

        let chain: Vec<_> = registry.kind_ancestors(button).collect();
        assert_eq!(chain, vec![button, control, element]);
        assert!(registry.is_kind_of(button, element));
        assert!(!registry.is_kind_of(element, button));
        assert_eq!(registry.kind_by_name("Control"), Some(control));
        assert_eq!(registry.kind_name(button), Some("Button"));
        assert_eq!(registry.kind_ancestors(KindId::new(99)).count(), 0);

        assert!(matches!(
            registry.register_kind("Button", None),
            Err(PropertyError::DuplicateRegistration { owner: None, .. })
        ));
    }

    #[test]
    fn registry_inherits() {
        let (mut registry, element) = with_element();

        let font_size = registry
            .register(
                "FontSize",
                element,
                PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
            )
            .unwrap();
        let width = registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        assert!(registry.inherits(font_size.id()));
        assert!(!registry.inherits(width.id()));
    }

    #[test]
    fn registry_get_metadata() {
        let (mut registry, element) = with_element();

        let width = registry
            .register(
                "Width",
                element,
                PropertyMetadataBuilder::new(100.0_f64).inherits(true).build(),
            )
            .unwrap();

        let metadata = registry.get_metadata(width).unwrap();
        assert_eq!(metadata.default_value(), &100.0);
        assert!(metadata.inherits());

        let wrong: Property<i32> = Property::from_id(width.id());
        assert!(registry.get_metadata(wrong).is_none());
    }

    #[test]
    fn type_checks() {
        let (mut registry, element) = with_element();
        let width = registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        assert!(registry.check_type(width).is_ok());
        assert!(registry.check_value(width.id(), &ErasedValue::new(3.0_f64)).is_ok());
        assert_eq!(
            registry.check_value(width.id(), &ErasedValue::new(3_i32)),
            Err(PropertyError::TypeMismatch {
                property: width.id(),
                expected: "f64",
                found: "i32",
            })
        );
        let missing = PropertyId::new(40);
        assert_eq!(
            registry.check_value(missing, &ErasedValue::new(3.0_f64)),
            Err(PropertyError::UnknownProperty(missing))
        );
    }

    #[test]
    fn changed_unions_affects_with_callback() {
        let (mut registry, element) = with_element();
        let opacity = registry
            .register(
                "Opacity",
                element,
                PropertyMetadataBuilder::new(1.0_f64)
                    .affects(Invalidation::PAINT_RESOURCES)
                    .on_changed(|old, new| {
                        if (*old == 0.0) != (*new == 0.0) {
                            Invalidation::MEASURE
                        } else {
                            Invalidation::empty()
                        }
                    })
                    .build(),
            )
            .unwrap();
        let reg = registry.get(opacity.id()).unwrap();

        let half = ErasedValue::new(0.5_f64);
        assert_eq!(
            reg.changed(&ErasedValue::new(1.0_f64), &half),
            Invalidation::PAINT_RESOURCES
        );
        assert_eq!(
            reg.changed(&ErasedValue::new(0.0_f64), &half),
            Invalidation::PAINT_RESOURCES | Invalidation::MEASURE
        );
        assert_eq!(reg.default_value().downcast_ref::<f64>(), Some(&1.0));
    }

    #[test]
    fn registry_iter() {
        let (mut registry, element) = with_element();
        registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        registry
            .register("Height", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        let names: Vec<_> = registry.iter().map(|(_, r)| r.name()).collect();
        assert_eq!(names, vec!["Width", "Height"]);
    }

    #[test]
    fn registry_debug() {
        let (mut registry, element) = with_element();
        registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();

        let debug = format!("{:?}", registry);
        assert!(debug.contains("PropertyRegistry"));
        assert!(debug.contains("Element"));
        assert!(debug.contains("Width"));
    }
}
