// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation primitives.
//!
//! Each primitive reports whether it changed any state. Repeating a call on an
//! already-invalid element is a constant-time no-op, so cascades stop as soon
//! as they reach state that is already pending.

use alloc::vec::Vec;

use understory_property::Invalidation;

use crate::id::ElementId;
use crate::tree::ElementTree;

impl ElementTree {
    /// Marks the element's desired size as stale.
    ///
    /// Cascades to [`invalidate_arrange`](Self::invalidate_arrange) and to the
    /// parent's measure, so the next layout pass from the root reaches the
    /// element. Returns `false` for stale handles and already-invalid state.
    pub fn invalidate_measure(&mut self, id: ElementId) -> bool {
        let Ok(el) = self.element_mut(id) else {
            return false;
        };
        if !el.measure.invalidate() {
            return false;
        }
        let parent = el.parent;
        tracing::trace!(?id, "measure invalidated");
        self.invalidate_arrange(id);
        if let Some(parent) = parent {
            self.invalidate_measure(parent);
        }
        true
    }

    /// Marks the element's arrangement as stale.
    ///
    /// Invalidates the element's transform and its subtree's world
    /// transforms, then the parent's arrangement.
    pub fn invalidate_arrange(&mut self, id: ElementId) -> bool {
        let Ok(el) = self.element_mut(id) else {
            return false;
        };
        if !el.arrange.invalidate() {
            return false;
        }
        let parent = el.parent;
        tracing::trace!(?id, "arrange invalidated");
        self.invalidate_transform(id);
        if let Some(parent) = parent {
            self.invalidate_arrange(parent);
        }
        true
    }

    /// Marks the element's paint resources as stale and invalidates its
    /// measure, since resources may change the intrinsic size.
    pub fn invalidate_paint_resources(&mut self, id: ElementId) -> bool {
        let Ok(el) = self.element_mut(id) else {
            return false;
        };
        let changed = core::mem::replace(&mut el.paint_resources_valid, false);
        if changed {
            tracing::trace!(?id, "paint resources invalidated");
        }
        self.invalidate_measure(id) | changed
    }

    /// Marks the element's local transform and the world transforms of its
    /// whole subtree as stale.
    pub fn invalidate_transform(&mut self, id: ElementId) -> bool {
        let Ok(el) = self.element_mut(id) else {
            return false;
        };
        let local = el.local_transform.invalidate();
        let world = self.invalidate_world(id);
        if local || world {
            tracing::trace!(?id, "transform invalidated");
        }
        local || world
    }

    /// Invalidates world transforms below and including `id`.
    ///
    /// A world transform is only ever computed after its parent's, so an
    /// invalid world transform means the whole subtree below it is invalid
    /// too, and the walk stops there.
    fn invalidate_world(&mut self, id: ElementId) -> bool {
        let mut changed = false;
        let mut stack: Vec<ElementId> = alloc::vec![id];
        while let Some(current) = stack.pop() {
            let Ok(el) = self.element_mut(current) else {
                continue;
            };
            if el.world.invalidate() {
                changed = true;
                stack.extend(el.children.iter().copied());
            }
        }
        changed
    }

    /// Applies an invalidation set produced by a property change on `id`.
    pub(crate) fn apply_invalidation(&mut self, id: ElementId, flags: Invalidation) {
        if flags.is_empty() {
            return;
        }
        if flags.contains(Invalidation::STYLE) {
            self.restyle(id);
        }
        if flags.contains(Invalidation::PAINT_RESOURCES) {
            self.invalidate_paint_resources(id);
        }
        if flags.contains(Invalidation::MEASURE) {
            self.invalidate_measure(id);
        }
        if flags.contains(Invalidation::ARRANGE) {
            self.invalidate_arrange(id);
        }
        if flags.contains(Invalidation::TRANSFORM) {
            self.invalidate_transform(id);
        }
        if flags.contains(Invalidation::PARENT_MEASURE)
            && let Ok(Some(parent)) = self.parent(id)
        {
            self.invalidate_measure(parent);
        }
    }

    /// Returns `true` if the element's paint resources are current.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`](crate::ElementError::StaleElement) if
    /// `id` has been removed.
    pub fn paint_resources_valid(&self, id: ElementId) -> Result<bool, crate::ElementError> {
        Ok(self.element(id)?.paint_resources_valid)
    }

    /// Returns `true` if both the local and world transforms are cached.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`](crate::ElementError::StaleElement) if
    /// `id` has been removed.
    pub fn transform_valid(&self, id: ElementId) -> Result<bool, crate::ElementError> {
        let el = self.element(id)?;
        Ok(el.local_transform.is_valid() && el.world.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use crate::{CoreProperties, ElementTree, LayoutState};
    use kurbo::Size;
    use understory_property::PropertyRegistry;

    fn tree() -> ElementTree {
        let mut registry = PropertyRegistry::new();
        let core = CoreProperties::register(&mut registry).unwrap();
        ElementTree::new(registry, core)
    }

    #[test]
    fn repeated_invalidation_is_a_no_op() {
        let mut tree = tree();
        let root = tree.create(tree.core().element).unwrap();
        let child = tree.create(tree.core().element).unwrap();
        tree.append_child(root, child).unwrap();
        tree.update_layout(root, Size::new(100.0, 100.0)).unwrap();
        assert_eq!(tree.layout_state(child), Ok(LayoutState::Arranged));

        assert!(tree.invalidate_measure(child));
        assert!(!tree.invalidate_measure(child));
        assert_eq!(tree.layout_state(child), Ok(LayoutState::Unmeasured));
        // The cascade reached the parent.
        assert_eq!(tree.layout_state(root), Ok(LayoutState::Unmeasured));
        assert!(!tree.invalidate_arrange(root));
    }

    #[test]
    fn arrange_invalidation_keeps_measure() {
        let mut tree = tree();
        let root = tree.create(tree.core().element).unwrap();
        tree.update_layout(root, Size::new(10.0, 10.0)).unwrap();
        tree.world_transform(root).unwrap();
        assert_eq!(tree.transform_valid(root), Ok(true));

        assert!(tree.invalidate_arrange(root));
        assert_eq!(tree.layout_state(root), Ok(LayoutState::Measured));
        assert_eq!(tree.transform_valid(root), Ok(false));
        assert!(!tree.invalidate_transform(root));
    }

    #[test]
    fn transform_invalidation_reaches_descendants() {
        let mut tree = tree();
        let root = tree.create(tree.core().element).unwrap();
        let child = tree.create(tree.core().element).unwrap();
        let leaf = tree.create(tree.core().element).unwrap();
        tree.append_child(root, child).unwrap();
        tree.append_child(child, leaf).unwrap();
        tree.update_layout(root, Size::new(10.0, 10.0)).unwrap();
        assert_eq!(tree.transform_valid(child), Ok(false));
        tree.world_transform(leaf).unwrap();
        assert_eq!(tree.transform_valid(child), Ok(true));

        assert!(tree.invalidate_transform(root));
        assert_eq!(tree.transform_valid(leaf), Ok(false));
        assert_eq!(tree.transform_valid(child), Ok(false));
        assert_eq!(tree.layout_state(leaf), Ok(LayoutState::Arranged));
    }

    #[test]
    fn paint_resources_cascade_to_measure() {
        let mut tree = tree();
        let root = tree.create(tree.core().element).unwrap();
        tree.update_layout(root, Size::new(10.0, 10.0)).unwrap();
        assert_eq!(tree.paint_resources_valid(root), Ok(true));

        assert!(tree.invalidate_paint_resources(root));
        assert_eq!(tree.paint_resources_valid(root), Ok(false));
        assert_eq!(tree.layout_state(root), Ok(LayoutState::Unmeasured));
        assert!(!tree.invalidate_paint_resources(root));
    }
}
