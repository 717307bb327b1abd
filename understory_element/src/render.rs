// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer contract, paint resources, and the render walk.
//!
//! Elements do not draw themselves. A [`Renderer`] attached to an element's
//! style measures its intrinsic content, builds a per-element paint resource,
//! and draws onto a backend [`Surface`]. The tree owns each element's
//! resource and hands it back to the renderer for rebuilds and deletion.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::time::Duration;

use kurbo::{Affine, Rect, Size};
use understory_property::{KindId, Property, PropertyValue};

use crate::error::ElementError;
use crate::id::ElementId;
use crate::props::CoreProperties;
use crate::tree::ElementTree;

/// A style whose renderer slot holds an element renderer.
pub type Style = understory_style::Style<Rc<dyn Renderer>>;
/// Builder for [`Style`].
pub type StyleBuilder = understory_style::StyleBuilder<Rc<dyn Renderer>>;
/// A theme of element styles.
pub type Theme = understory_style::Theme<Rc<dyn Renderer>>;
/// Builder for [`Theme`].
pub type ThemeBuilder = understory_style::ThemeBuilder<Rc<dyn Renderer>>;

/// Drawing backend target.
pub trait Surface {
    /// Sets the transform for subsequent drawing.
    fn set_transform(&mut self, transform: Affine);

    /// Gives renderers access to the concrete backend.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Draws one kind of element.
///
/// Renderers are attached to styles and shared between every element using
/// that style. Callbacks get read-only access to the element; running layout
/// or mutating the tree from inside them is not supported.
pub trait Renderer {
    /// Returns the intrinsic content size for the available content size.
    fn measure(&self, element: &ElementRef<'_>, available: Size) -> Size {
        let _ = (element, available);
        Size::ZERO
    }

    /// Draws the element. The surface transform is already set to the
    /// element's world transform.
    fn render(&self, element: &ElementRef<'_>, surface: &mut dyn Surface, dt: Duration);

    /// Builds the element's paint resource, reusing `previous` if useful.
    fn update_resources(
        &self,
        element: &ElementRef<'_>,
        previous: Option<Box<dyn Any>>,
    ) -> Box<dyn Any>;

    /// Releases a paint resource built by this renderer.
    fn delete_resources(&self, element: &ElementRef<'_>, resource: Box<dyn Any>) {
        let _ = element;
        drop(resource);
    }
}

/// Read-only view of one element, handed to renderers.
#[derive(Copy, Clone)]
pub struct ElementRef<'a> {
    tree: &'a ElementTree,
    id: ElementId,
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementRef").field(&self.id).finish()
    }
}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(tree: &'a ElementTree, id: ElementId) -> Self {
        Self { tree, id }
    }

    /// Returns the element's id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Returns the tree the element lives in.
    #[must_use]
    #[inline]
    pub fn tree(&self) -> &'a ElementTree {
        self.tree
    }

    /// Returns the built-in property handles.
    #[must_use]
    #[inline]
    pub fn core(&self) -> &'a CoreProperties {
        self.tree.core()
    }

    /// Returns the element's kind.
    #[must_use]
    pub fn kind(&self) -> Option<KindId> {
        self.tree.kind(self.id).ok()
    }

    /// Returns the element's effective property value.
    ///
    /// # Errors
    ///
    /// As for [`ElementTree::get`].
    pub fn get<T: PropertyValue>(&self, property: Property<T>) -> Result<T, ElementError> {
        self.tree.get(self.id, property)
    }

    /// Returns the element's content bounds in parent space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.tree.bounds(self.id).unwrap_or(Rect::ZERO)
    }

    /// Returns the element's desired size, margin included.
    #[must_use]
    pub fn desired_size(&self) -> Size {
        self.tree.desired_size(self.id).unwrap_or(Size::ZERO)
    }

    /// Returns the element's world transform.
    #[must_use]
    pub fn world_transform(&self) -> Affine {
        self.tree.world_transform(self.id).unwrap_or(Affine::IDENTITY)
    }

    /// Returns the element's paint resource, if present and of type `R`.
    #[must_use]
    pub fn resource<R: Any>(&self) -> Option<&'a R> {
        self.tree.resource(self.id).ok()
    }
}

impl ElementTree {
    /// Returns the renderer of the element's resolved style.
    pub(crate) fn renderer(&self, id: ElementId) -> Option<Rc<dyn Renderer>> {
        self.style(id).ok()??.renderer().cloned()
    }

    /// Rebuilds the element's paint resource if it is stale.
    pub(crate) fn ensure_paint_resources(&mut self, id: ElementId) -> Result<(), ElementError> {
        if self.element(id)?.paint_resources_valid {
            return Ok(());
        }
        if let Some(renderer) = self.renderer(id) {
            let previous = self.element_mut(id)?.resource.take();
            let resource = renderer.update_resources(&ElementRef::new(self, id), previous);
            self.element_mut(id)?.resource = Some(resource);
            tracing::trace!(?id, "paint resources rebuilt");
        }
        self.element_mut(id)?.paint_resources_valid = true;
        Ok(())
    }

    /// Hands the element's resource to its current renderer for deletion.
    pub(crate) fn release_resource(&mut self, id: ElementId) {
        let renderer = self.renderer(id);
        self.release_resource_with(id, renderer);
    }

    /// Hands the element's resource to `renderer` for deletion, or drops it.
    pub(crate) fn release_resource_with(&mut self, id: ElementId, renderer: Option<Rc<dyn Renderer>>) {
        let Some(resource) = self.element_mut(id).ok().and_then(|el| el.resource.take()) else {
            return;
        };
        match renderer {
            Some(renderer) => renderer.delete_resources(&ElementRef::new(self, id), resource),
            None => drop(resource),
        }
    }

    /// Returns the element's paint resource.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`ElementError::ResourceNotFound`] if no resource was built for the
    ///   element or it is not an `R`.
    pub fn resource<R: Any>(&self, id: ElementId) -> Result<&R, ElementError> {
        self.element(id)?
            .resource
            .as_ref()
            .and_then(|resource| resource.downcast_ref::<R>())
            .ok_or(ElementError::ResourceNotFound(id))
    }

    /// Draws the subtree at `root` in paint order: each element before its
    /// children, children in order.
    ///
    /// Hidden elements are skipped with their subtrees. Stale paint resources
    /// are rebuilt before an element is drawn, and the surface transform is
    /// set to each element's world transform. Run layout first.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `root` has been removed.
    pub fn render(
        &mut self,
        root: ElementId,
        surface: &mut dyn Surface,
        dt: Duration,
    ) -> Result<(), ElementError> {
        self.element(root)?;
        let mut stack: Vec<ElementId> = alloc::vec![root];
        while let Some(id) = stack.pop() {
            if !self.get(id, self.core.is_visible)? {
                continue;
            }
            self.ensure_paint_resources(id)?;
            surface.set_transform(self.world_transform(id)?);
            if let Some(renderer) = self.renderer(id) {
                renderer.render(&ElementRef::new(self, id), surface, dt);
            }
            stack.extend(self.children(id)?.iter().rev().copied());
        }
        Ok(())
    }
}
