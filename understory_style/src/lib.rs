// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Style: styles, themes, and value resolution for dependency
//! properties.
//!
//! This crate extends `understory_property` with style support and the full
//! precedence chain:
//!
//! **Binding → Local → Style → Inherited → Default**
//!
//! ## Core Concepts
//!
//! ### Styles
//!
//! [`Style`] is a shared collection of property setters with an optional
//! based-on style and an optional renderer `R`. Unlike per-element storage,
//! styles are immutable after creation and can be shared across many
//! elements, matching `WinUI`'s `OptimizedStyle` approach.
//!
//! ### Themes
//!
//! [`Theme`] maps `(kind, optional style key)` to a style. [`Theme::lookup`]
//! walks the registry's kind hierarchy, most derived kind first, and yields
//! `None` when no kind in the chain has a matching style.
//!
//! ```rust
//! use understory_property::{PropertyMetadataBuilder, PropertyRegistry};
//! use understory_style::{StyleBuilder, ThemeBuilder};
//!
//! let mut registry = PropertyRegistry::new();
//! let element = registry.register_kind("Element", None).unwrap();
//! let button = registry.register_kind("Button", Some(element)).unwrap();
//! let width = registry
//!     .register("Width", element, PropertyMetadataBuilder::new(0.0_f64).build())
//!     .unwrap();
//!
//! let light = ThemeBuilder::<()>::new()
//!     .style(element, StyleBuilder::new().set(width, 80.0).build())
//!     .build();
//!
//! let style = light.lookup(&registry, button, None).unwrap();
//! assert_eq!(style.get(width), Some(&80.0));
//! ```
//!
//! ### Resolution Context
//!
//! [`ResolveCx`] resolves effective values against any element store that
//! implements [`ValueTiers`], and reports the winning tier as a
//! [`ValueSource`].
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod resolve;
mod style;
mod theme;

pub use resolve::{ResolveCx, ValueSource, ValueTiers};
pub use style::{Style, StyleBuilder};
pub use theme::{Theme, ThemeBuilder};
