// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-pass layout: measure, then arrange.
//!
//! ## Measure
//!
//! [`ElementTree::measure`] computes an element's *desired size* for an
//! available size, margin included. Results are cached per element and
//! reused while the available size is bit-for-bit identical and nothing has
//! invalidated the measure.
//!
//! ## Arrange
//!
//! [`ElementTree::arrange`] places an element in a *layout slot* given in
//! parent space (margin included). The element's content bounds are the slot
//! minus margin, sized and aligned by the explicit size and alignment
//! properties. Children are placed by the element's [`LayoutPolicy`] inside
//! the *inner rect*: the content bounds in local coordinates, minus padding.
//!
//! Arranging with the slot from the previous pass is a no-op while the
//! arrangement is valid.

mod policies;

pub use policies::{Decorator, DockPanel, Overlay, StackPanel};

use alloc::rc::Rc;
use core::fmt;

use kurbo::{Insets, Rect, Size};
use smallvec::SmallVec;
use understory_property::{Property, PropertyValue};

use crate::error::ElementError;
use crate::id::ElementId;
use crate::props::{CoreProperties, HorizontalAlignment, VerticalAlignment};
use crate::render::ElementRef;
use crate::tree::ElementTree;

/// Strategy for measuring and placing an element's children.
///
/// Policies are shared (`Rc<dyn LayoutPolicy>`) and stateless with respect to
/// any particular element; everything they need comes through [`LayoutCx`].
pub trait LayoutPolicy: fmt::Debug {
    /// Measures the children against the element's content-available size
    /// and returns the size they need together.
    fn measure_children(&self, cx: &mut LayoutCx<'_>, available: Size) -> Size;

    /// Arranges the children inside `inner`, given in the element's local
    /// coordinates.
    fn arrange_children(&self, cx: &mut LayoutCx<'_>, inner: Rect);
}

/// Progress of an element through the layout passes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayoutState {
    /// The desired size is stale or was never computed.
    Unmeasured,
    /// The desired size is current, the arrangement is not.
    Measured,
    /// Both passes are current.
    Arranged,
}

/// Access to the tree for a [`LayoutPolicy`] working on one element.
pub struct LayoutCx<'a> {
    tree: &'a mut ElementTree,
    element: ElementId,
}

impl fmt::Debug for LayoutCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCx")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl<'a> LayoutCx<'a> {
    pub(crate) fn new(tree: &'a mut ElementTree, element: ElementId) -> Self {
        Self { tree, element }
    }

    /// Returns the element being laid out.
    #[must_use]
    #[inline]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Returns the element's children in order.
    #[must_use]
    pub fn children(&self) -> SmallVec<[ElementId; 4]> {
        self.tree
            .children(self.element)
            .map(SmallVec::from_slice)
            .unwrap_or_default()
    }

    /// Measures a child and returns its desired size.
    pub fn measure_child(&mut self, child: ElementId, available: Size) -> Size {
        match self.tree.measure(child, available) {
            Ok(size) => size,
            Err(err) => {
                tracing::warn!(?child, %err, "measure failed");
                Size::ZERO
            }
        }
    }

    /// Arranges a child in `slot`, given in this element's local coordinates.
    pub fn arrange_child(&mut self, child: ElementId, slot: Rect) {
        if let Err(err) = self.tree.arrange(child, slot) {
            tracing::warn!(?child, %err, "arrange failed");
        }
    }

    /// Returns a child's last desired size.
    #[must_use]
    pub fn desired_size(&self, child: ElementId) -> Size {
        self.tree.desired_size(child).unwrap_or(Size::ZERO)
    }

    /// Returns an element's effective property value, or `None` if the
    /// element or handle is invalid.
    #[must_use]
    pub fn get<T: PropertyValue>(&self, element: ElementId, property: Property<T>) -> Option<T> {
        self.tree.get(element, property).ok()
    }

    /// Returns the built-in property handles.
    #[must_use]
    #[inline]
    pub fn core(&self) -> &CoreProperties {
        self.tree.core()
    }
}

/// Layout-relevant property values of one element.
struct Sizing {
    visible: bool,
    width: Option<f64>,
    height: Option<f64>,
    min: Size,
    max: Size,
    margin: Insets,
    padding: Insets,
    horizontal: HorizontalAlignment,
    vertical: VerticalAlignment,
}

/// Clamps negatives and NaN to zero.
pub(crate) fn non_negative(v: f64) -> f64 {
    if v > 0.0 { v } else { 0.0 }
}

fn same_size(a: Size, b: Size) -> bool {
    a.width.to_bits() == b.width.to_bits() && a.height.to_bits() == b.height.to_bits()
}

fn same_rect(a: Rect, b: Rect) -> bool {
    a.x0.to_bits() == b.x0.to_bits()
        && a.y0.to_bits() == b.y0.to_bits()
        && a.x1.to_bits() == b.x1.to_bits()
        && a.y1.to_bits() == b.y1.to_bits()
}

/// Size and offset of the content bounds along one axis of the slot.
///
/// `outer` is the slot extent minus margin, `desired` the desired extent
/// minus margin. Returns `(offset, extent)`.
fn place(outer: f64, desired: f64, fill: Option<(f64, f64)>, start: bool, end: bool) -> (f64, f64) {
    let extent = match fill {
        Some((min, max)) if outer.is_finite() => outer.min(max).max(min),
        _ => desired,
    };
    let offset = if start || (fill.is_some() && extent > outer) {
        0.0
    } else if end {
        outer - extent
    } else {
        (outer - extent) / 2.0
    };
    (offset, extent)
}

impl ElementTree {
    fn sizing(&self, id: ElementId) -> Result<Sizing, ElementError> {
        let core = &self.core;
        Ok(Sizing {
            visible: self.get(id, core.is_visible)?,
            width: self.get(id, core.width)?,
            height: self.get(id, core.height)?,
            min: Size::new(self.get(id, core.min_width)?, self.get(id, core.min_height)?),
            max: Size::new(self.get(id, core.max_width)?, self.get(id, core.max_height)?),
            margin: self.get(id, core.margin)?,
            padding: self.get(id, core.padding)?,
            horizontal: self.get(id, core.horizontal_alignment)?,
            vertical: self.get(id, core.vertical_alignment)?,
        })
    }

    /// Measures `id` against `available` (margin included) and returns its
    /// desired size (margin included).
    ///
    /// Rebuilds stale paint resources first. Collapsed elements desire zero.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn measure(&mut self, id: ElementId, available: Size) -> Result<Size, ElementError> {
        let el = self.element_mut(id)?;
        if let Some(previous) = el.measure.get()
            && same_size(*previous, available)
        {
            return Ok(el.desired);
        }
        el.measure.invalidate();

        self.ensure_paint_resources(id)?;
        let sizing = self.sizing(id)?;
        let desired = if sizing.visible {
            self.measure_content(id, &sizing, available)?
        } else {
            Size::ZERO
        };

        let el = self.element_mut(id)?;
        let changed = !same_size(el.desired, desired);
        el.desired = desired;
        el.measure.set(available);
        if changed {
            self.invalidate_arrange(id);
        }
        tracing::debug!(?id, ?available, ?desired, "measured");
        Ok(desired)
    }

    fn measure_content(
        &mut self,
        id: ElementId,
        sizing: &Sizing,
        available: Size,
    ) -> Result<Size, ElementError> {
        let margin = sizing.margin.size();
        let padding = sizing.padding.size();

        let outer = Size::new(
            non_negative(available.width - margin.width),
            non_negative(available.height - margin.height),
        );
        let constrained = Size::new(
            sizing.width.unwrap_or(outer.width).min(sizing.max.width).max(sizing.min.width),
            sizing.height.unwrap_or(outer.height).min(sizing.max.height).max(sizing.min.height),
        );
        let content = Size::new(
            non_negative(constrained.width - padding.width),
            non_negative(constrained.height - padding.height),
        );

        let intrinsic = match self.renderer(id) {
            Some(renderer) => renderer.measure(&ElementRef::new(self, id), content),
            None => Size::ZERO,
        };
        let policy = Rc::clone(&self.element(id)?.policy);
        let children = policy.measure_children(&mut LayoutCx::new(self, id), content);

        let mut size = Size::new(
            intrinsic.width.max(children.width) + padding.width,
            intrinsic.height.max(children.height) + padding.height,
        );
        if let Some(width) = sizing.width {
            size.width = width;
        }
        if let Some(height) = sizing.height {
            size.height = height;
        }
        size.width = non_negative(size.width.min(sizing.max.width).max(sizing.min.width));
        size.height = non_negative(size.height.min(sizing.max.height).max(sizing.min.height));

        Ok(Size::new(size.width + margin.width, size.height + margin.height))
    }

    /// Arranges `id` in `slot`, given in parent space with margin included.
    ///
    /// Measures first (against the slot size) if the measure is stale.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn arrange(&mut self, id: ElementId, slot: Rect) -> Result<(), ElementError> {
        let el = self.element_mut(id)?;
        if let Some(previous) = el.arrange.get()
            && same_rect(*previous, slot)
        {
            return Ok(());
        }
        el.arrange.invalidate();
        if !el.measure.is_valid() {
            self.measure(id, slot.size())?;
        }

        let sizing = self.sizing(id)?;
        let desired = self.element(id)?.desired;
        let bounds = if sizing.visible {
            content_bounds(&sizing, desired, slot)
        } else {
            Rect::from_origin_size(slot.origin(), Size::ZERO)
        };
        self.element_mut(id)?.bounds = bounds;
        self.invalidate_transform(id);

        if sizing.visible {
            let padding = sizing.padding;
            let inner = Rect::new(
                padding.x0,
                padding.y0,
                (bounds.width() - padding.x1).max(padding.x0),
                (bounds.height() - padding.y1).max(padding.y0),
            );
            let policy = Rc::clone(&self.element(id)?.policy);
            policy.arrange_children(&mut LayoutCx::new(self, id), inner);
        }

        self.element_mut(id)?.arrange.set(slot);
        tracing::debug!(?id, ?slot, ?bounds, "arranged");
        Ok(())
    }

    /// Measures `root` against `available`, then arranges it at the origin.
    ///
    /// Unbounded axes of `available` are arranged at the desired size.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `root` has been removed.
    pub fn update_layout(&mut self, root: ElementId, available: Size) -> Result<(), ElementError> {
        let desired = self.measure(root, available)?;
        let width = if available.width.is_finite() {
            available.width
        } else {
            desired.width
        };
        let height = if available.height.is_finite() {
            available.height
        } else {
            desired.height
        };
        self.arrange(root, Rect::new(0.0, 0.0, width, height))
    }

    /// Returns the desired size from the last measure, margin included.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn desired_size(&self, id: ElementId) -> Result<Size, ElementError> {
        Ok(self.element(id)?.desired)
    }

    /// Returns the content bounds from the last arrange, in parent space.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn bounds(&self, id: ElementId) -> Result<Rect, ElementError> {
        Ok(self.element(id)?.bounds)
    }

    /// Returns the layout slot of the current arrangement, if valid.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn layout_slot(&self, id: ElementId) -> Result<Option<Rect>, ElementError> {
        Ok(self.element(id)?.arrange.get().copied())
    }

    /// Returns how far the element has progressed through layout.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn layout_state(&self, id: ElementId) -> Result<LayoutState, ElementError> {
        let el = self.element(id)?;
        Ok(if el.arrange.is_valid() {
            LayoutState::Arranged
        } else if el.measure.is_valid() {
            LayoutState::Measured
        } else {
            LayoutState::Unmeasured
        })
    }
}

fn content_bounds(sizing: &Sizing, desired: Size, slot: Rect) -> Rect {
    let margin = sizing.margin;
    let outer = Size::new(
        non_negative(slot.width() - margin.x0 - margin.x1),
        non_negative(slot.height() - margin.y0 - margin.y1),
    );
    let inner_desired = Size::new(
        non_negative(desired.width - margin.x0 - margin.x1),
        non_negative(desired.height - margin.y0 - margin.y1),
    );

    let fill_x = (sizing.horizontal == HorizontalAlignment::Stretch && sizing.width.is_none())
        .then_some((sizing.min.width, sizing.max.width));
    let (dx, width) = place(
        outer.width,
        inner_desired.width,
        fill_x,
        sizing.horizontal == HorizontalAlignment::Left,
        sizing.horizontal == HorizontalAlignment::Right,
    );
    let fill_y = (sizing.vertical == VerticalAlignment::Stretch && sizing.height.is_none())
        .then_some((sizing.min.height, sizing.max.height));
    let (dy, height) = place(
        outer.height,
        inner_desired.height,
        fill_y,
        sizing.vertical == VerticalAlignment::Top,
        sizing.vertical == VerticalAlignment::Bottom,
    );

    Rect::from_origin_size(
        (slot.x0 + margin.x0 + dx, slot.y0 + margin.y0 + dy),
        Size::new(width, height),
    )
}
