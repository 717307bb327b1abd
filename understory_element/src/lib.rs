// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Element: a retained element tree with dependency properties,
//! an invalidation cascade, two-pass layout, and cached transforms.
//!
//! This crate ties `understory_property` and `understory_style` together into
//! an [`ElementTree`].
//!
//! - Elements live in an arena and are addressed by [`ElementId`] handles that
//!   never alias after removal.
//! - Property values resolve **Binding → Local → Style → Inherited → Default**.
//!   Styles come from the tree's [`Theme`], looked up by element kind and the
//!   [`StyleKey`](CoreProperties::style_key) property.
//! - Changing an effective value runs the property's change callback, notifies
//!   observers, and applies the resulting invalidations: style, paint
//!   resources, measure, arrange, transform.
//! - Layout runs measure then arrange through per-element [`LayoutPolicy`]
//!   objects, caching results until invalidated.
//! - Local and world transforms are computed lazily and cached, which also
//!   drives [`ElementTree::hit_test`].
//! - Drawing is delegated to [`Renderer`]s attached to styles.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Insets, Point, Rect, Size};
//! use understory_element::{CoreProperties, ElementTree, LayoutState};
//! use understory_property::PropertyRegistry;
//!
//! let mut registry = PropertyRegistry::new();
//! let core = CoreProperties::register(&mut registry).unwrap();
//! let mut tree = ElementTree::new(registry, core.clone());
//!
//! let root = tree.create(core.stack_panel).unwrap();
//! let header = tree.create(core.element).unwrap();
//! let body = tree.create(core.element).unwrap();
//! tree.append_child(root, header).unwrap();
//! tree.append_child(root, body).unwrap();
//! tree.set_local(header, core.height, Some(20.0)).unwrap();
//! tree.set_local(body, core.height, Some(50.0)).unwrap();
//! tree.set_local(body, core.margin, Insets::uniform(5.0)).unwrap();
//!
//! tree.update_layout(root, Size::new(200.0, 300.0)).unwrap();
//! assert_eq!(tree.bounds(body).unwrap(), Rect::new(5.0, 25.0, 195.0, 75.0));
//! assert_eq!(tree.hit_test(root, Point::new(10.0, 30.0)).unwrap(), Some(body));
//!
//! // Changing a layout property invalidates the affected passes.
//! tree.set_local(header, core.height, Some(30.0)).unwrap();
//! assert_eq!(tree.layout_state(root).unwrap(), LayoutState::Unmeasured);
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to `kurbo/std`.
//! - `libm`: forwards to `kurbo/libm` for `no_std` targets.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cache;
mod element;
mod error;
mod id;
mod invalidate;
mod layout;
mod props;
mod render;
mod transform;
mod tree;

pub use cache::Cached;
pub use error::ElementError;
pub use id::ElementId;
pub use layout::{
    Decorator, DockPanel, LayoutCx, LayoutPolicy, LayoutState, Overlay, StackPanel,
};
pub use props::{CoreProperties, Dock, HorizontalAlignment, Orientation, VerticalAlignment};
pub use render::{ElementRef, Renderer, Style, StyleBuilder, Surface, Theme, ThemeBuilder};
pub use tree::{ElementTree, ObserverId, PropertyChanged};
