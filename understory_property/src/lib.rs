// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: dependency property registry, storage and bindings.
//!
//! This crate provides the foundation of a dependency property system:
//! registration of element kinds and properties, per-element local value
//! storage, and the binding contract. Style resolution and the full
//! five-tier precedence are provided by `understory_style`; element trees
//! live in `understory_element`.
//!
//! ## Core Concepts
//!
//! ### Registration
//!
//! [`PropertyRegistry`] holds element kinds ([`KindId`], with single
//! inheritance) and properties ([`Property<T>`], keyed by `(owner, name)`).
//! Each property carries [`PropertyMetadata`]: default value, whether it
//! inherits, whether it is attached, which caches it invalidates
//! ([`Invalidation`]), and optional coerce and change callbacks.
//!
//! The registry is mutated during setup and then shared read-only; element
//! trees take it by value and keep it behind an `Rc`.
//!
//! ### Storage
//!
//! [`PropertyStore`] holds an element's local values in a sorted sparse map.
//!
//! ### Bindings
//!
//! [`Binding`] is the top resolution tier. [`BindingSource`] is a ready-made
//! shared cell with one-way and two-way bindings.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_property::{
//!     Invalidation, Property, PropertyMetadataBuilder, PropertyRegistry, PropertyStore,
//! };
//!
//! let mut registry = PropertyRegistry::new();
//! let element = registry.register_kind("Element", None).unwrap();
//! let width: Property<f64> = registry
//!     .register(
//!         "Width",
//!         element,
//!         PropertyMetadataBuilder::new(0.0_f64)
//!             .coerce(|w: f64| w.max(0.0))
//!             .affects(Invalidation::MEASURE)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let mut store = PropertyStore::new();
//! let metadata = registry.get_metadata(width).unwrap();
//! store.set_local(width, metadata.coerce(-20.0));
//! assert_eq!(store.get_local(width), Some(&0.0));
//! assert_eq!(registry.affects(width.id()), Invalidation::MEASURE);
//! ```
//!
//! ## Memory Optimizations
//!
//! | Optimization | Description |
//! |--------------|-------------|
//! | **Sparse storage** | `PropertyStore` only allocates for locally set properties |
//! | **Shared defaults** | Default values stored in registry, not per-element |
//! | **Inline storage** | `SmallVec` for small property counts |
//! | **`PropertyId` as u16** | Compact property identification |
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod binding;
mod error;
mod id;
mod invalidation;
mod metadata;
mod registry;
mod store;
mod value;

pub use binding::{
    Binding, BindingMode, BindingSource, ChangeNotifier, ErasedBinding, SourceBinding,
};
pub use error::PropertyError;
pub use id::{KindId, Property, PropertyId};
pub use invalidation::Invalidation;
pub use metadata::{
    CoerceValueCallback, PropertyChangedCallback, PropertyMetadata, PropertyMetadataBuilder,
};
pub use registry::{KindRegistration, PropertyRegistration, PropertyRegistry};
pub use store::PropertyStore;
pub use value::{ErasedValue, PropertyValue};
