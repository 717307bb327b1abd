// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-element sparse property storage.
//!
//! This module provides [`PropertyStore`] for storing local property values,
//! using sparse storage to minimize memory for elements with few properties set.
//!
//! # Implementation
//!
//! Following the `WinUI` approach, we use a sorted vector with binary search rather
//! than a hash map. This provides:
//!
//! - Better cache locality (contiguous memory)
//! - Lower memory overhead (no hash buckets)
//! - O(log n) lookup, which is fast for typical property counts (5-20)
//! - Inline storage for small property sets via `SmallVec`
//!
//! # Scope
//!
//! `PropertyStore` holds the **local tier only**. Bindings, styles and
//! inheritance are resolved by higher layers (see `understory_style`), and
//! type checking against the registry happens before values reach the store.

use smallvec::SmallVec;

use crate::id::{Property, PropertyId};
use crate::value::{ErasedValue, PropertyValue};

/// Default inline capacity for property entries.
///
/// Most UI elements have fewer than 8 non-default properties set,
/// so this avoids heap allocation in the common case.
const INLINE_CAPACITY: usize = 8;

/// Per-element sparse storage for local property values.
///
/// # Example
///
/// ```rust
/// use understory_property::{PropertyMetadataBuilder, PropertyRegistry, PropertyStore};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let width = registry
///     .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
///     .unwrap();
///
/// let mut store = PropertyStore::new();
/// assert!(store.get_local(width).is_none());
///
/// store.set_local(width, 100.0);
/// assert_eq!(store.get_local(width), Some(&100.0));
///
/// let previous = store.clear_local(width);
/// assert_eq!(previous.and_then(|v| v.downcast_ref::<f64>().copied()), Some(100.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    /// Local values, sorted by [`PropertyId`] for binary search lookup.
    entries: SmallVec<[(PropertyId, ErasedValue); INLINE_CAPACITY]>,
}

impl PropertyStore {
    /// Creates a new empty property store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no properties have local values.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of properties with local values.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the property IDs that have local values, in ascending order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Returns the `(id, value)` entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &ErasedValue)> + '_ {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    #[inline]
    fn find(&self, id: PropertyId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(pid, _)| *pid)
    }

    // =========================================================================
    // Erased access
    // =========================================================================

    /// Gets the local value for a property id, if set.
    #[must_use]
    #[inline]
    pub fn get(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.find(id).ok().map(|idx| &self.entries[idx].1)
    }

    /// Sets the local value for a property id.
    ///
    /// Returns the value it replaced, if any.
    pub fn set(&mut self, id: PropertyId, value: ErasedValue) -> Option<ErasedValue> {
        match self.find(id) {
            Ok(idx) => Some(core::mem::replace(&mut self.entries[idx].1, value)),
            Err(idx) => {
                self.entries.insert(idx, (id, value));
                None
            }
        }
    }

    /// Removes the local value for a property id.
    ///
    /// Returns the removed value, if any.
    pub fn clear(&mut self, id: PropertyId) -> Option<ErasedValue> {
        self.find(id).ok().map(|idx| self.entries.remove(idx).1)
    }

    /// Returns `true` if the property id has a local value.
    #[must_use]
    #[inline]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.find(id).is_ok()
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    /// Gets the local value, if set and of type `T`.
    #[must_use]
    #[inline]
    pub fn get_local<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.get(property.id()).and_then(ErasedValue::downcast_ref)
    }

    /// Sets the local value.
    ///
    /// Returns the value it replaced, if any.
    pub fn set_local<T: PropertyValue>(
        &mut self,
        property: Property<T>,
        value: T,
    ) -> Option<ErasedValue> {
        self.set(property.id(), ErasedValue::new(value))
    }

    /// Clears the local value.
    ///
    /// Returns the removed value, if any.
    pub fn clear_local<T: PropertyValue>(&mut self, property: Property<T>) -> Option<ErasedValue> {
        self.clear(property.id())
    }

    /// Returns `true` if the property has a local value.
    #[must_use]
    #[inline]
    pub fn has_local<T: PropertyValue>(&self, property: Property<T>) -> bool {
        self.contains(property.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use crate::registry::PropertyRegistry;
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    fn setup_registry() -> (PropertyRegistry, Property<f64>, Property<i32>) {
        let mut registry = PropertyRegistry::new();
        let element = registry.register_kind("Element", None).unwrap();
        let width = registry
            .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
            .unwrap();
        let count = registry
            .register("Count", element, PropertyMetadataBuilder::new(0_i32).build())
            .unwrap();
        (registry, width, count)
    }

    #[test]
    fn store_new() {
        let store = PropertyStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn store_set_get_local() {
        let (_, width, _) = setup_registry();
        let mut store = PropertyStore::new();

        assert!(store.get_local(width).is_none());

        assert!(store.set_local(width, 100.0).is_none());
        assert_eq!(store.get_local(width), Some(&100.0));
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);

        let previous = store.set_local(width, 150.0);
        assert_eq!(previous, Some(ErasedValue::new(100.0_f64)));
        assert_eq!(store.get_local(width), Some(&150.0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_clear_local() {
        let (_, width, _) = setup_registry();
        let mut store = PropertyStore::new();

        store.set_local(width, 100.0);
        assert!(store.has_local(width));

        assert!(store.clear_local(width).is_some());
        assert!(!store.has_local(width));
        assert!(store.is_empty());

        // Clearing a missing value returns nothing.
        assert!(store.clear_local(width).is_none());
    }

    #[test]
    fn mistyped_handle_reads_nothing() {
        let (_, width, _) = setup_registry();
        let mut store = PropertyStore::new();
        store.set_local(width, 1.0);

        let wrong: Property<i32> = Property::from_id(width.id());
        assert!(store.get_local(wrong).is_none());
        assert!(store.has_local(wrong));
    }

    #[test]
    fn store_clone() {
        let (_, width, _) = setup_registry();
        let mut store = PropertyStore::new();
        store.set_local(width, 100.0);

        let cloned = store.clone();
        assert_eq!(cloned.get_local(width), Some(&100.0));
    }

    #[test]
    fn store_sorted_order() {
        let mut registry = PropertyRegistry::new();
        let element = registry.register_kind("Element", None).unwrap();
        // Register in reverse order to test sorting
        let c: Property<i32> = registry
            .register("C", element, PropertyMetadataBuilder::new(0).build())
            .unwrap();
        let a: Property<i32> = registry
            .register("A", element, PropertyMetadataBuilder::new(0).build())
            .unwrap();
        let b: Property<i32> = registry
            .register("B", element, PropertyMetadataBuilder::new(0).build())
            .unwrap();

        let mut store = PropertyStore::new();
        store.set_local(b, 2);
        store.set_local(c, 3);
        store.set_local(a, 1);

        let ids: Vec<_> = store.property_ids().collect();
        assert_eq!(ids.len(), 3);
        for i in 1..ids.len() {
            assert!(ids[i - 1].index() < ids[i].index());
        }
    }

    #[test]
    fn store_binary_search_correctness() {
        let mut registry = PropertyRegistry::new();
        let element = registry.register_kind("Element", None).unwrap();
        let props: Vec<Property<i32>> = (0..20)
            .map(|i| {
                registry
                    .register(
                        Box::leak(alloc::format!("Prop{i}").into_boxed_str()),
                        element,
                        PropertyMetadataBuilder::new(0).build(),
                    )
                    .unwrap()
            })
            .collect();

        let mut store = PropertyStore::new();

        // Set every other property
        for (i, prop) in props.iter().enumerate() {
            if i % 2 == 0 {
                let value = i32::try_from(i).unwrap();
                store.set_local(*prop, value);
            }
        }

        for (i, prop) in props.iter().enumerate() {
            if i % 2 == 0 {
                let value = i32::try_from(i).unwrap();
                assert_eq!(store.get_local(*prop), Some(&value));
            } else {
                assert!(store.get_local(*prop).is_none());
            }
        }
    }
}
