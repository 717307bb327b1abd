// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-element storage inside the tree arena.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::any::Any;

use kurbo::{Affine, Rect, Size};
use smallvec::SmallVec;
use understory_property::{ErasedBinding, ErasedValue, KindId, PropertyId, PropertyStore};

use crate::cache::Cached;
use crate::id::ElementId;
use crate::layout::LayoutPolicy;
use crate::render::Style;

/// An attached binding plus the last value pulled from it.
pub(crate) struct BindingSlot {
    pub(crate) binding: ErasedBinding,
    /// Coerced value, refreshed by `process_binding_changes`.
    pub(crate) value: ErasedValue,
    /// Notifiers hold a weak reference; dropping the slot silences them.
    pub(crate) _alive: Rc<()>,
}

/// World matrix with its inverse, computed together.
#[derive(Copy, Clone, Debug)]
pub(crate) struct WorldTransform {
    pub(crate) world: Affine,
    pub(crate) inverse: Option<Affine>,
}

impl WorldTransform {
    pub(crate) fn new(world: Affine) -> Self {
        let det = world.determinant();
        let inverse = (det != 0.0 && det.is_finite()).then(|| world.inverse());
        Self { world, inverse }
    }
}

pub(crate) struct Element {
    pub(crate) serial: u32,
    pub(crate) kind: KindId,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: SmallVec<[ElementId; 4]>,

    pub(crate) store: PropertyStore,
    pub(crate) bindings: SmallVec<[(PropertyId, BindingSlot); 1]>,
    pub(crate) style: Cached<Option<Style>>,

    pub(crate) policy: Rc<dyn LayoutPolicy>,
    /// Valid while the desired size is current; holds the available size it
    /// was measured against.
    pub(crate) measure: Cached<Size>,
    pub(crate) desired: Size,
    /// Valid while the arrangement is current; holds the layout slot.
    pub(crate) arrange: Cached<Rect>,
    /// Content bounds in parent space (slot minus margin, aligned).
    pub(crate) bounds: Rect,

    pub(crate) local_transform: Cached<Affine>,
    pub(crate) world: Cached<WorldTransform>,

    pub(crate) paint_resources_valid: bool,
    pub(crate) resource: Option<Box<dyn Any>>,
}

impl Element {
    pub(crate) fn new(serial: u32, kind: KindId, policy: Rc<dyn LayoutPolicy>) -> Self {
        Self {
            serial,
            kind,
            parent: None,
            children: SmallVec::new(),
            store: PropertyStore::new(),
            bindings: SmallVec::new(),
            style: Cached::new(),
            policy,
            measure: Cached::new(),
            desired: Size::ZERO,
            arrange: Cached::new(),
            bounds: Rect::ZERO,
            local_transform: Cached::new(),
            world: Cached::new(),
            paint_resources_valid: false,
            resource: None,
        }
    }

    fn binding_index(&self, id: PropertyId) -> Option<usize> {
        self.bindings.iter().position(|(pid, _)| *pid == id)
    }

    pub(crate) fn binding(&self, id: PropertyId) -> Option<&BindingSlot> {
        self.binding_index(id).map(|idx| &self.bindings[idx].1)
    }

    pub(crate) fn binding_mut(&mut self, id: PropertyId) -> Option<&mut BindingSlot> {
        self.binding_index(id).map(|idx| &mut self.bindings[idx].1)
    }

    /// Installs a binding, replacing (and dropping) any previous one.
    pub(crate) fn set_binding(&mut self, id: PropertyId, slot: BindingSlot) {
        match self.binding_index(id) {
            Some(idx) => self.bindings[idx].1 = slot,
            None => self.bindings.push((id, slot)),
        }
    }

    pub(crate) fn remove_binding(&mut self, id: PropertyId) -> Option<BindingSlot> {
        self.binding_index(id)
            .map(|idx| self.bindings.swap_remove(idx).1)
    }
}
