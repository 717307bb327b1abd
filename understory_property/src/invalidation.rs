// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation vocabulary shared by property metadata and element trees.

bitflags::bitflags! {
    /// Caches that a property change invalidates on the element that changed.
    ///
    /// Properties differ in impact, so nothing is invalidated automatically:
    /// a property declares what it affects through
    /// [`PropertyMetadataBuilder::affects`](crate::PropertyMetadataBuilder::affects)
    /// and/or returns a set from its change callback.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Invalidation: u8 {
        /// The measured (desired) size. Implies [`Self::ARRANGE`].
        const MEASURE = 0b0000_0001;
        /// The arranged geometry. Implies [`Self::TRANSFORM`].
        const ARRANGE = 0b0000_0010;
        /// The local transform and every descendant's world transform.
        const TRANSFORM = 0b0000_0100;
        /// Paint-side resources. Implies [`Self::MEASURE`].
        const PAINT_RESOURCES = 0b0000_1000;
        /// The element's resolved style.
        const STYLE = 0b0001_0000;
        /// The parent's measure, for properties a container reads off its
        /// children (attached layout properties).
        const PARENT_MEASURE = 0b0010_0000;
    }
}
