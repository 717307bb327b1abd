// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in element kinds and layout/transform properties.

use alloc::rc::Rc;

use kurbo::{Insets, Vec2};
use understory_property::{
    Invalidation, KindId, Property, PropertyError, PropertyMetadataBuilder, PropertyRegistry,
};

use crate::layout::non_negative;

/// Horizontal placement of an element inside its layout slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    /// Align to the left edge.
    Left,
    /// Center horizontally.
    Center,
    /// Align to the right edge.
    Right,
    /// Fill the slot width unless an explicit width is set.
    #[default]
    Stretch,
}

/// Vertical placement of an element inside its layout slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    /// Align to the top edge.
    Top,
    /// Center vertically.
    Center,
    /// Align to the bottom edge.
    Bottom,
    /// Fill the slot height unless an explicit height is set.
    #[default]
    Stretch,
}

/// Stacking axis of a [`StackPanel`](crate::StackPanel).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Children are placed left to right.
    Horizontal,
    /// Children are placed top to bottom.
    #[default]
    Vertical,
}

/// Edge a child docks to inside a [`DockPanel`](crate::DockPanel).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dock {
    /// Dock to the left edge.
    #[default]
    Left,
    /// Dock to the top edge.
    Top,
    /// Dock to the right edge.
    Right,
    /// Dock to the bottom edge.
    Bottom,
}

/// Handles for the kinds and properties every element tree relies on.
///
/// Register them once with [`CoreProperties::register`] during setup, before
/// handing the registry to an [`ElementTree`](crate::ElementTree).
#[derive(Clone, Debug)]
pub struct CoreProperties {
    /// Base kind of every element.
    pub element: KindId,
    /// Base kind of multi-child containers.
    pub panel: KindId,
    /// Sequential container; created with a [`StackPanel`](crate::StackPanel) policy.
    pub stack_panel: KindId,
    /// Edge-docking container; created with a [`DockPanel`](crate::DockPanel) policy.
    pub dock_panel: KindId,
    /// Single-child container; created with a [`Decorator`](crate::Decorator) policy.
    pub decorator: KindId,

    /// Explicit width, replacing the measured width when set.
    pub width: Property<Option<f64>>,
    /// Explicit height, replacing the measured height when set.
    pub height: Property<Option<f64>>,
    /// Lower bound on the width (excluding margin).
    pub min_width: Property<f64>,
    /// Lower bound on the height (excluding margin).
    pub min_height: Property<f64>,
    /// Upper bound on the width (excluding margin).
    pub max_width: Property<f64>,
    /// Upper bound on the height (excluding margin).
    pub max_height: Property<f64>,
    /// Space around the element, outside its content bounds.
    pub margin: Property<Insets>,
    /// Space between the content bounds and the children.
    pub padding: Property<Insets>,
    /// Scale applied by the local transform.
    pub scale: Property<Vec2>,
    /// Rotation in radians applied by the local transform.
    pub rotation: Property<f64>,
    /// Whether the element takes part in layout, rendering and hit testing.
    pub is_visible: Property<bool>,
    /// Whether the element can be returned by hit testing.
    pub is_hit_test_visible: Property<bool>,
    /// Key selecting a keyed style from the theme.
    pub style_key: Property<Option<Rc<str>>>,
    /// Horizontal placement inside the layout slot.
    pub horizontal_alignment: Property<HorizontalAlignment>,
    /// Vertical placement inside the layout slot.
    pub vertical_alignment: Property<VerticalAlignment>,
    /// Docking edge, read by a parent [`DockPanel`](crate::DockPanel).
    pub dock: Property<Dock>,
}

impl CoreProperties {
    /// Registers the built-in kinds and properties.
    ///
    /// # Errors
    ///
    /// [`PropertyError::DuplicateRegistration`] if they are already registered.
    pub fn register(registry: &mut PropertyRegistry) -> Result<Self, PropertyError> {
        let element = registry.register_kind("Element", None)?;
        let panel = registry.register_kind("Panel", Some(element))?;
        let stack_panel = registry.register_kind("StackPanel", Some(panel))?;
        let dock_panel = registry.register_kind("DockPanel", Some(panel))?;
        let decorator = registry.register_kind("Decorator", Some(element))?;

        let size = |default: f64| {
            PropertyMetadataBuilder::new(default)
                .coerce(non_negative)
                .affects(Invalidation::MEASURE)
                .build()
        };
        let explicit = || {
            PropertyMetadataBuilder::new(None::<f64>)
                .coerce(|v: Option<f64>| v.map(non_negative))
                .affects(Invalidation::MEASURE)
                .build()
        };
        let insets = || {
            PropertyMetadataBuilder::new(Insets::ZERO)
                .affects(Invalidation::MEASURE)
                .build()
        };

        Ok(Self {
            element,
            panel,
            stack_panel,
            dock_panel,
            decorator,
            width: registry.register("Width", element, explicit())?,
            height: registry.register("Height", element, explicit())?,
            min_width: registry.register("MinWidth", element, size(0.0))?,
            min_height: registry.register("MinHeight", element, size(0.0))?,
            max_width: registry.register("MaxWidth", element, size(f64::INFINITY))?,
            max_height: registry.register("MaxHeight", element, size(f64::INFINITY))?,
            margin: registry.register("Margin", element, insets())?,
            padding: registry.register("Padding", element, insets())?,
            scale: registry.register(
                "Scale",
                element,
                PropertyMetadataBuilder::new(Vec2::new(1.0, 1.0))
                    .affects(Invalidation::TRANSFORM)
                    .build(),
            )?,
            rotation: registry.register(
                "Rotation",
                element,
                PropertyMetadataBuilder::new(0.0_f64)
                    .affects(Invalidation::TRANSFORM)
                    .build(),
            )?,
            is_visible: registry.register(
                "IsVisible",
                element,
                PropertyMetadataBuilder::new(true)
                    .affects(Invalidation::MEASURE)
                    .build(),
            )?,
            is_hit_test_visible: registry.register(
                "IsHitTestVisible",
                element,
                PropertyMetadataBuilder::new(true).build(),
            )?,
            style_key: registry.register(
                "StyleKey",
                element,
                PropertyMetadataBuilder::new(None::<Rc<str>>)
                    .affects(Invalidation::STYLE)
                    .build(),
            )?,
            horizontal_alignment: registry.register(
                "HorizontalAlignment",
                element,
                PropertyMetadataBuilder::new(HorizontalAlignment::Stretch)
                    .affects(Invalidation::ARRANGE)
                    .build(),
            )?,
            vertical_alignment: registry.register(
                "VerticalAlignment",
                element,
                PropertyMetadataBuilder::new(VerticalAlignment::Stretch)
                    .affects(Invalidation::ARRANGE)
                    .build(),
            )?,
            dock: registry.register(
                "Dock",
                dock_panel,
                PropertyMetadataBuilder::new(Dock::Left)
                    .attached(true)
                    .affects(Invalidation::PARENT_MEASURE)
                    .build(),
            )?,
        })
    }
}
