// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Theme-scoped style tables.
//!
//! This module provides [`Theme`], a per-kind table of styles, and the
//! kind-hierarchy lookup elements use to find their style.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::fmt;

use hashbrown::HashMap;
use understory_property::{KindId, PropertyRegistry};

use crate::style::Style;

/// The styles registered for one kind.
struct KindStyles<R> {
    default: Option<Style<R>>,
    keyed: HashMap<Box<str>, Style<R>>,
}

impl<R> Default for KindStyles<R> {
    fn default() -> Self {
        Self {
            default: None,
            keyed: HashMap::new(),
        }
    }
}

/// A collection of styles keyed by element kind and optional style key.
///
/// Swapping themes (light/dark modes, brand variants) means handing a tree a
/// different `Theme`; each element then re-resolves its style lazily.
///
/// Themes are immutable after creation. Use [`ThemeBuilder`] to construct them.
///
/// # Memory Layout
///
/// Internally, `Theme` wraps an `Rc<ThemeData>`, making cloning cheap.
///
/// # Example
///
/// ```rust
/// use understory_property::PropertyRegistry;
/// use understory_style::{StyleBuilder, ThemeBuilder};
///
/// let mut registry = PropertyRegistry::new();
/// let element = registry.register_kind("Element", None).unwrap();
/// let control = registry.register_kind("Control", Some(element)).unwrap();
/// let button = registry.register_kind("Button", Some(control)).unwrap();
///
/// let control_style = StyleBuilder::<()>::new().build();
/// let theme = ThemeBuilder::new()
///     .style(control, control_style.clone())
///     .build();
///
/// // Buttons have no style of their own and fall back to Control's.
/// let found = theme.lookup(&registry, button, None).unwrap();
/// assert!(found.ptr_eq(&control_style));
/// assert!(theme.lookup(&registry, element, None).is_none());
/// ```
pub struct Theme<R> {
    inner: Rc<ThemeData<R>>,
}

/// Internal storage for theme styles.
struct ThemeData<R> {
    kinds: HashMap<KindId, KindStyles<R>>,
}

impl<R> Theme<R> {
    /// Returns `true` if this theme has no styles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of styles in this theme.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .kinds
            .values()
            .map(|k| usize::from(k.default.is_some()) + k.keyed.len())
            .sum()
    }

    /// Gets the style registered for exactly `kind` and `key`.
    ///
    /// `None` as the key selects the kind's default style.
    #[must_use]
    pub fn get(&self, kind: KindId, key: Option<&str>) -> Option<&Style<R>> {
        let styles = self.inner.kinds.get(&kind)?;
        match key {
            Some(key) => styles.keyed.get(key),
            None => styles.default.as_ref(),
        }
    }

    /// Finds the style for an element of `kind` with an optional style key.
    ///
    /// Tries `kind` first, then each base kind in turn, with the same key at
    /// every level. Returns `None` when the hierarchy is exhausted.
    #[must_use]
    pub fn lookup(
        &self,
        registry: &PropertyRegistry,
        kind: KindId,
        key: Option<&str>,
    ) -> Option<Style<R>> {
        let found = registry
            .kind_ancestors(kind)
            .find_map(|k| self.get(k, key).map(|style| (k, style)));
        match found {
            Some((matched, style)) => {
                tracing::trace!(?kind, ?matched, key, "style found");
                Some(style.clone())
            }
            None => {
                tracing::trace!(?kind, key, "no style");
                None
            }
        }
    }

    /// Returns `true` if both handles refer to the same theme.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Clone for Theme<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R> Default for Theme<R> {
    fn default() -> Self {
        ThemeBuilder::new().build()
    }
}

impl<R> fmt::Debug for Theme<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theme")
            .field("kinds", &self.inner.kinds.len())
            .field("styles", &self.len())
            .finish()
    }
}

/// Builder for constructing [`Theme`] instances.
///
/// # Example
///
/// ```rust
/// use understory_property::PropertyRegistry;
/// use understory_style::{StyleBuilder, ThemeBuilder};
///
/// let mut registry = PropertyRegistry::new();
/// let button = registry.register_kind("Button", None).unwrap();
///
/// let theme = ThemeBuilder::<()>::new()
///     .style(button, StyleBuilder::new().build())
///     .keyed_style(button, "accent", StyleBuilder::new().build())
///     .build();
///
/// assert_eq!(theme.len(), 2);
/// assert!(theme.get(button, Some("accent")).is_some());
/// assert!(theme.get(button, Some("danger")).is_none());
/// ```
pub struct ThemeBuilder<R> {
    kinds: HashMap<KindId, KindStyles<R>>,
}

impl<R> Default for ThemeBuilder<R> {
    fn default() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }
}

impl<R> fmt::Debug for ThemeBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeBuilder")
            .field("kinds", &self.kinds.len())
            .finish_non_exhaustive()
    }
}

impl<R> ThemeBuilder<R> {
    /// Creates a new empty theme builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default style for `kind`, replacing any previous one.
    #[must_use]
    pub fn style(mut self, kind: KindId, style: Style<R>) -> Self {
        self.kinds.entry(kind).or_default().default = Some(style);
        self
    }

    /// Sets the style for `kind` under an explicit style key, replacing any
    /// previous one.
    #[must_use]
    pub fn keyed_style(mut self, kind: KindId, key: &str, style: Style<R>) -> Self {
        self.kinds
            .entry(kind)
            .or_default()
            .keyed
            .insert(key.into(), style);
        self
    }

    /// Builds the theme.
    #[must_use]
    pub fn build(self) -> Theme<R> {
        Theme {
            inner: Rc::new(ThemeData { kinds: self.kinds }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleBuilder;

    struct Kinds {
        registry: PropertyRegistry,
        element: KindId,
        control: KindId,
        button: KindId,
    }

    fn kinds() -> Kinds {
        let mut registry = PropertyRegistry::new();
        let element = registry.register_kind("Element", None).unwrap();
        let control = registry.register_kind("Control", Some(element)).unwrap();
        let button = registry.register_kind("Button", Some(control)).unwrap();
        Kinds {
            registry,
            element,
            control,
            button,
        }
    }

    #[test]
    fn theme_empty() {
        let theme = Theme::<()>::default();
        assert!(theme.is_empty());
        assert_eq!(theme.len(), 0);
    }

    #[test]
    fn exact_match_wins_over_base() {
        let k = kinds();
        let base = StyleBuilder::<()>::new().build();
        let exact = StyleBuilder::<()>::new().build();
        let theme = ThemeBuilder::new()
            .style(k.element, base)
            .style(k.button, exact.clone())
            .build();

        let found = theme.lookup(&k.registry, k.button, None).unwrap();
        assert!(found.ptr_eq(&exact));
    }

    #[test]
    fn miss_walks_kind_hierarchy() {
        let k = kinds();
        let base = StyleBuilder::<()>::new().build();
        let theme = ThemeBuilder::new().style(k.element, base.clone()).build();

        let found = theme.lookup(&k.registry, k.button, None).unwrap();
        assert!(found.ptr_eq(&base));
    }

    #[test]
    fn keyed_lookup_uses_key_at_every_level() {
        let k = kinds();
        let accent = StyleBuilder::<()>::new().build();
        let theme = ThemeBuilder::new()
            .style(k.button, StyleBuilder::new().build())
            .keyed_style(k.control, "accent", accent.clone())
            .build();

        let found = theme.lookup(&k.registry, k.button, Some("accent")).unwrap();
        assert!(found.ptr_eq(&accent));

        // A key nobody defines misses, even though Button has a default style.
        assert!(theme.lookup(&k.registry, k.button, Some("danger")).is_none());
    }

    #[test]
    fn final_miss_is_none() {
        let k = kinds();
        let theme = ThemeBuilder::<()>::new()
            .style(k.button, StyleBuilder::new().build())
            .build();
        assert!(theme.lookup(&k.registry, k.control, None).is_none());
    }

    #[test]
    fn replacing_a_style() {
        let k = kinds();
        let first = StyleBuilder::<()>::new().build();
        let second = StyleBuilder::<()>::new().build();
        let theme = ThemeBuilder::new()
            .style(k.control, first)
            .style(k.control, second.clone())
            .build();
        assert_eq!(theme.len(), 1);
        assert!(theme.get(k.control, None).unwrap().ptr_eq(&second));
    }

    #[test]
    fn theme_clone_is_cheap() {
        let theme = ThemeBuilder::<()>::new().build();
        let theme2 = theme.clone();
        assert!(theme.ptr_eq(&theme2));
        assert!(!theme.ptr_eq(&Theme::default()));
    }
}
