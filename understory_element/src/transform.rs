// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached local/world transforms and hit testing.
//!
//! Transforms are computed lazily on first read through `&self` and stay
//! cached until an invalidation clears them. The local matrix is
//! `translate(content origin) * scale * rotate`; the world matrix is the
//! parent's world matrix times the local one.

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect, Vec2};

use crate::element::WorldTransform;
use crate::error::ElementError;
use crate::id::ElementId;
use crate::tree::ElementTree;

impl ElementTree {
    fn compute_local(&self, id: ElementId) -> Result<Affine, ElementError> {
        let el = self.element(id)?;
        let scale: Vec2 = self.get(id, self.core.scale)?;
        let rotation: f64 = self.get(id, self.core.rotation)?;
        Ok(Affine::translate(el.bounds.origin().to_vec2())
            * Affine::scale_non_uniform(scale.x, scale.y)
            * Affine::rotate(rotation))
    }

    fn world_cell(&self, id: ElementId) -> Result<&WorldTransform, ElementError> {
        let el = self.element(id)?;
        if let Some(world) = el.world.get() {
            return Ok(world);
        }
        let parent = match el.parent {
            Some(parent) => self.world_cell(parent)?.world,
            None => Affine::IDENTITY,
        };
        let local = self.local_transform(id)?;
        Ok(el.world.get_or_compute(|| WorldTransform::new(parent * local)))
    }

    /// Returns the element's transform into its parent's space.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn local_transform(&self, id: ElementId) -> Result<Affine, ElementError> {
        let el = self.element(id)?;
        if let Some(local) = el.local_transform.get() {
            return Ok(*local);
        }
        let local = self.compute_local(id)?;
        Ok(*el.local_transform.get_or_compute(|| local))
    }

    /// Returns the element's transform into root (screen) space.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn world_transform(&self, id: ElementId) -> Result<Affine, ElementError> {
        Ok(self.world_cell(id)?.world)
    }

    /// Maps a point in the element's local space to screen space.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn point_to_screen(&self, id: ElementId, point: Point) -> Result<Point, ElementError> {
        Ok(self.world_cell(id)?.world * point)
    }

    /// Maps a screen-space point into the element's local space.
    ///
    /// Returns `None` if the world transform is singular.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn point_from_screen(
        &self,
        id: ElementId,
        point: Point,
    ) -> Result<Option<Point>, ElementError> {
        Ok(self.world_cell(id)?.inverse.map(|inverse| inverse * point))
    }

    fn hit_eligible(&self, id: ElementId) -> bool {
        self.get(id, self.core.is_visible).unwrap_or(false)
            && self.get(id, self.core.is_hit_test_visible).unwrap_or(false)
    }

    /// Finds the topmost element under a screen-space point.
    ///
    /// Later children paint over earlier ones and children over their
    /// parent, so the search visits children in reverse order before the
    /// element itself. Elements that are hidden or not hit-test visible are
    /// skipped along with their subtrees.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `root` has been removed.
    pub fn hit_test(&self, root: ElementId, point: Point) -> Result<Option<ElementId>, ElementError> {
        self.element(root)?;

        enum Visit {
            Enter(ElementId),
            Check(ElementId),
        }

        let mut stack: Vec<Visit> = alloc::vec![Visit::Enter(root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    if !self.hit_eligible(id) {
                        continue;
                    }
                    stack.push(Visit::Check(id));
                    // Pushed in order so the last child pops first.
                    stack.extend(self.children(id)?.iter().map(|&c| Visit::Enter(c)));
                }
                Visit::Check(id) => {
                    let Some(local) = self.point_from_screen(id, point)? else {
                        continue;
                    };
                    let size = self.bounds(id)?.size();
                    if Rect::from_origin_size(Point::ORIGIN, size).contains(local) {
                        return Ok(Some(id));
                    }
                }
            }
        }
        Ok(None)
    }
}
