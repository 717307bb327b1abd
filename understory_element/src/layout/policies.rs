// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in layout policies.

use kurbo::{Rect, Size};

use super::{LayoutCx, LayoutPolicy};
use crate::props::{Dock, Orientation};

/// Places every child at the inner rect's origin with its desired size.
///
/// This is the policy of plain elements.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlay;

impl LayoutPolicy for Overlay {
    fn measure_children(&self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        let mut size = Size::ZERO;
        for child in cx.children() {
            let desired = cx.measure_child(child, available);
            size.width = size.width.max(desired.width);
            size.height = size.height.max(desired.height);
        }
        size
    }

    fn arrange_children(&self, cx: &mut LayoutCx<'_>, inner: Rect) {
        for child in cx.children() {
            let desired = cx.desired_size(child);
            cx.arrange_child(child, Rect::from_origin_size(inner.origin(), desired));
        }
    }
}

/// Stacks children one after another along an axis.
///
/// Children are measured with unbounded space along the axis; each gets a
/// slot as long as its desired size along the axis and as wide as the inner
/// rect across it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StackPanel {
    /// The stacking axis.
    pub orientation: Orientation,
}

impl StackPanel {
    /// Creates a stack panel policy.
    #[must_use]
    pub const fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }
}

impl LayoutPolicy for StackPanel {
    fn measure_children(&self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        let child_available = match self.orientation {
            Orientation::Horizontal => Size::new(f64::INFINITY, available.height),
            Orientation::Vertical => Size::new(available.width, f64::INFINITY),
        };
        let mut size = Size::ZERO;
        for child in cx.children() {
            let desired = cx.measure_child(child, child_available);
            match self.orientation {
                Orientation::Horizontal => {
                    size.width += desired.width;
                    size.height = size.height.max(desired.height);
                }
                Orientation::Vertical => {
                    size.width = size.width.max(desired.width);
                    size.height += desired.height;
                }
            }
        }
        size
    }

    fn arrange_children(&self, cx: &mut LayoutCx<'_>, inner: Rect) {
        let mut cursor = match self.orientation {
            Orientation::Horizontal => inner.x0,
            Orientation::Vertical => inner.y0,
        };
        for child in cx.children() {
            let desired = cx.desired_size(child);
            let slot = match self.orientation {
                Orientation::Horizontal => {
                    Rect::new(cursor, inner.y0, cursor + desired.width, inner.y1)
                }
                Orientation::Vertical => {
                    Rect::new(inner.x0, cursor, inner.x1, cursor + desired.height)
                }
            };
            cursor = match self.orientation {
                Orientation::Horizontal => slot.x1,
                Orientation::Vertical => slot.y1,
            };
            cx.arrange_child(child, slot);
        }
    }
}

/// Docks children against the edges of the remaining space, in child order.
///
/// Each child's edge comes from the attached
/// [`Dock`](crate::CoreProperties::dock) property. With `last_child_fill` the
/// last child takes whatever space is left.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DockPanel {
    /// Whether the last child fills the remaining space.
    pub last_child_fill: bool,
}

impl DockPanel {
    /// Creates a dock panel policy.
    #[must_use]
    pub const fn new(last_child_fill: bool) -> Self {
        Self { last_child_fill }
    }
}

impl Default for DockPanel {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LayoutPolicy for DockPanel {
    fn measure_children(&self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        let dock = cx.core().dock;
        let mut size = Size::ZERO;
        let mut used = Size::ZERO;
        for child in cx.children() {
            let remaining = Size::new(
                (available.width - used.width).max(0.0),
                (available.height - used.height).max(0.0),
            );
            let desired = cx.measure_child(child, remaining);
            match cx.get(child, dock).unwrap_or_default() {
                Dock::Left | Dock::Right => {
                    size.height = size.height.max(used.height + desired.height);
                    used.width += desired.width;
                }
                Dock::Top | Dock::Bottom => {
                    size.width = size.width.max(used.width + desired.width);
                    used.height += desired.height;
                }
            }
        }
        Size::new(size.width.max(used.width), size.height.max(used.height))
    }

    fn arrange_children(&self, cx: &mut LayoutCx<'_>, inner: Rect) {
        let dock = cx.core().dock;
        let children = cx.children();
        let fill_from = if self.last_child_fill {
            children.len().saturating_sub(1)
        } else {
            children.len()
        };

        let (mut left, mut top, mut right, mut bottom) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
        for (index, &child) in children.iter().enumerate() {
            let desired = cx.desired_size(child);
            let mut x = left;
            let mut y = top;
            let mut width = (inner.width() - left - right).max(0.0);
            let mut height = (inner.height() - top - bottom).max(0.0);

            if index < fill_from {
                match cx.get(child, dock).unwrap_or_default() {
                    Dock::Left => {
                        left += desired.width;
                        width = desired.width;
                    }
                    Dock::Right => {
                        right += desired.width;
                        x = (inner.width() - right).max(0.0);
                        width = desired.width;
                    }
                    Dock::Top => {
                        top += desired.height;
                        height = desired.height;
                    }
                    Dock::Bottom => {
                        bottom += desired.height;
                        y = (inner.height() - bottom).max(0.0);
                        height = desired.height;
                    }
                }
            }
            let slot = Rect::from_origin_size(
                (inner.x0 + x, inner.y0 + y),
                Size::new(width, height),
            );
            cx.arrange_child(child, slot);
        }
    }
}

/// Hosts a single child stretched over the inner rect.
///
/// The child's own alignment properties decide where its content goes. Any
/// further children are ignored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Decorator;

impl LayoutPolicy for Decorator {
    fn measure_children(&self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        match cx.children().first() {
            Some(&child) => cx.measure_child(child, available),
            None => Size::ZERO,
        }
    }

    fn arrange_children(&self, cx: &mut LayoutCx<'_>, inner: Rect) {
        if let Some(&child) = cx.children().first() {
            cx.arrange_child(child, inner);
        }
    }
}
