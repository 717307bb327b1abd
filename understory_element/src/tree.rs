// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The element tree: arena storage, structure, property values, bindings,
//! and styles.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use smallvec::SmallVec;
use understory_property::{
    Binding, BindingMode, ChangeNotifier, ErasedBinding, ErasedValue, KindId, Property,
    PropertyError, PropertyId, PropertyRegistry, PropertyValue,
};
use understory_style::{ResolveCx, ValueSource, ValueTiers};

use crate::element::{BindingSlot, Element};
use crate::error::ElementError;
use crate::id::ElementId;
use crate::layout::{Decorator, DockPanel, LayoutPolicy, Overlay, StackPanel};
use crate::props::{CoreProperties, Orientation};
use crate::render::{Style, Theme};

/// Handle returned by [`ElementTree::observe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// An effective-value change, delivered to observers.
#[derive(Copy, Clone, Debug)]
pub struct PropertyChanged<'a> {
    /// The element whose effective value changed.
    pub element: ElementId,
    /// The property that changed.
    pub property: PropertyId,
    /// The previous effective value.
    pub old: &'a ErasedValue,
    /// The new effective value.
    pub new: &'a ErasedValue,
}

type Observer = Box<dyn FnMut(&PropertyChanged<'_>)>;

/// A retained tree of elements.
///
/// The tree owns every element. Parents own their children through ordered
/// child lists; the parent handle stored on each element is a plain
/// [`ElementId`] and plays no part in lifetime management. Removing an
/// element removes its whole subtree.
///
/// Property values resolve through five tiers, highest first:
/// **Binding → Local → Style → Inherited → Default**. Every change to an
/// effective value runs the property's change callback, notifies observers,
/// and applies the resulting [`Invalidation`](understory_property::Invalidation)
/// set.
///
/// The registry is shared read-only once a tree owns it, so registration is
/// over by the time elements exist.
pub struct ElementTree {
    pub(crate) registry: Rc<PropertyRegistry>,
    pub(crate) core: CoreProperties,
    pub(crate) slots: Vec<Option<Element>>,
    free: Vec<u32>,
    next_serial: u32,
    len: usize,
    theme: Theme,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u32,
    pending: Rc<RefCell<Vec<(ElementId, PropertyId)>>>,
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTree")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .field("theme", &self.theme)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl ElementTree {
    /// Creates an empty tree over a finished registry.
    ///
    /// `core` must come from [`CoreProperties::register`] on the same registry.
    pub fn new(registry: impl Into<Rc<PropertyRegistry>>, core: CoreProperties) -> Self {
        Self {
            registry: registry.into(),
            core,
            slots: Vec::new(),
            free: Vec::new(),
            next_serial: 0,
            len: 0,
            theme: Theme::default(),
            observers: Vec::new(),
            next_observer: 0,
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns the property registry.
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Returns the built-in property handles.
    #[must_use]
    #[inline]
    pub fn core(&self) -> &CoreProperties {
        &self.core
    }

    /// Returns the number of live elements.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree has no live elements.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` refers to a live element.
    #[must_use]
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.live(id).is_some()
    }

    /// Iterates over live elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, el)| {
            el.as_ref().map(|el| ElementId::new(slot_index(slot), el.serial))
        })
    }

    pub(crate) fn live(&self, id: ElementId) -> Option<&Element> {
        match self.slots.get(id.idx()) {
            Some(Some(el)) if el.serial == id.serial => Some(el),
            _ => None,
        }
    }

    pub(crate) fn element(&self, id: ElementId) -> Result<&Element, ElementError> {
        self.live(id).ok_or(ElementError::StaleElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, ElementError> {
        match self.slots.get_mut(id.idx()) {
            Some(Some(el)) if el.serial == id.serial => Ok(el),
            _ => Err(ElementError::StaleElement(id)),
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Creates a detached element of `kind`.
    ///
    /// The layout policy follows the kind: stack panels stack vertically,
    /// dock panels dock with the last child filling, decorators stretch their
    /// child, and everything else overlays its children.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownKind`] if `kind` is not registered.
    pub fn create(&mut self, kind: KindId) -> Result<ElementId, ElementError> {
        let policy = self.default_policy(kind);
        self.create_with_policy(kind, policy)
    }

    /// Creates a detached element of `kind` with an explicit layout policy.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownKind`] if `kind` is not registered.
    ///
    /// # Panics
    ///
    /// Panics if the tree has handed out `u32::MAX` serials.
    pub fn create_with_policy(
        &mut self,
        kind: KindId,
        policy: Rc<dyn LayoutPolicy>,
    ) -> Result<ElementId, ElementError> {
        self.registry.kind(kind)?;
        let serial = self.next_serial;
        assert!(serial < u32::MAX, "element serials exhausted");
        self.next_serial += 1;

        let element = Element::new(serial, kind, policy);
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(element);
                slot
            }
            None => {
                self.slots.push(Some(element));
                slot_index(self.slots.len() - 1)
            }
        };
        self.len += 1;
        let id = ElementId::new(slot, serial);
        tracing::trace!(?id, kind = self.registry.kind_name(kind), "element created");
        Ok(id)
    }

    fn default_policy(&self, kind: KindId) -> Rc<dyn LayoutPolicy> {
        let core = &self.core;
        if self.registry.is_kind_of(kind, core.stack_panel) {
            Rc::new(StackPanel::new(Orientation::Vertical))
        } else if self.registry.is_kind_of(kind, core.dock_panel) {
            Rc::new(DockPanel::new(true))
        } else if self.registry.is_kind_of(kind, core.decorator) {
            Rc::new(Decorator)
        } else {
            Rc::new(Overlay)
        }
    }

    /// Returns the element's layout policy.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn layout_policy(&self, id: ElementId) -> Result<Rc<dyn LayoutPolicy>, ElementError> {
        Ok(Rc::clone(&self.element(id)?.policy))
    }

    /// Replaces the element's layout policy and invalidates its measure.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn set_layout_policy(
        &mut self,
        id: ElementId,
        policy: Rc<dyn LayoutPolicy>,
    ) -> Result<(), ElementError> {
        self.element_mut(id)?.policy = policy;
        self.invalidate_measure(id);
        Ok(())
    }

    /// Returns the element's kind.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn kind(&self, id: ElementId) -> Result<KindId, ElementError> {
        Ok(self.element(id)?.kind)
    }

    /// Returns the element's parent, or `None` for a root.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>, ElementError> {
        Ok(self.element(id)?.parent)
    }

    /// Returns the element's children in order.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn children(&self, id: ElementId) -> Result<&[ElementId], ElementError> {
        Ok(&self.element(id)?.children)
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// See [`insert_child`](Self::insert_child).
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), ElementError> {
        let index = self.element(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Inserts `child` into `parent`'s children at `index` (clamped to the
    /// child count), detaching it from any previous parent first.
    ///
    /// Inherited values seen by the moved subtree are re-resolved against
    /// the new ancestors, and every effective change is reported as for a
    /// property write.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if either handle has been removed.
    /// - [`ElementError::InvalidHierarchy`] if `child` is `parent` or one of
    ///   its ancestors.
    pub fn insert_child(
        &mut self,
        parent: ElementId,
        index: usize,
        child: ElementId,
    ) -> Result<(), ElementError> {
        self.element(parent)?;
        self.element(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ElementError::InvalidHierarchy { parent, child });
        }

        let inheriting = self.inheriting_properties();
        let mut old_parent = None;
        self.track_changes(child, &inheriting, |tree| {
            old_parent = tree.unlink(child);
            if let Ok(el) = tree.element_mut(parent) {
                let index = index.min(el.children.len());
                el.children.insert(index, child);
            }
            if let Ok(el) = tree.element_mut(child) {
                el.parent = Some(parent);
            }
        })?;

        if let Some(old) = old_parent
            && old != parent
        {
            self.invalidate_measure(old);
        }
        self.invalidate_transform(child);
        self.invalidate_measure(child);
        self.invalidate_measure(parent);
        Ok(())
    }

    /// Detaches `id` from its parent, making it a root. No-op for roots.
    ///
    /// Inherited values in the detached subtree fall back to what the
    /// subtree itself supplies, and changes are reported.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn detach(&mut self, id: ElementId) -> Result<(), ElementError> {
        if self.element(id)?.parent.is_none() {
            return Ok(());
        }
        let inheriting = self.inheriting_properties();
        let mut old_parent = None;
        self.track_changes(id, &inheriting, |tree| old_parent = tree.unlink(id))?;
        if let Some(parent) = old_parent {
            self.invalidate_measure(parent);
        }
        self.invalidate_transform(id);
        Ok(())
    }

    /// Removes `id` and its whole subtree.
    ///
    /// Paint resources are handed back to their renderers and bindings are
    /// dropped. Handles into the removed subtree become stale. No change
    /// notifications fire for the removed elements.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has already been removed.
    pub fn remove(&mut self, id: ElementId) -> Result<(), ElementError> {
        self.element(id)?;
        if let Some(parent) = self.unlink(id) {
            self.invalidate_measure(parent);
        }

        let mut doomed = Vec::new();
        let mut stack = alloc::vec![id];
        while let Some(current) = stack.pop() {
            if let Some(el) = self.live(current) {
                stack.extend(el.children.iter().copied());
                doomed.push(current);
            }
        }
        for &current in &doomed {
            self.release_resource(current);
        }
        for current in &doomed {
            self.slots[current.idx()] = None;
            self.free.push(current.slot);
            self.len -= 1;
        }
        tracing::trace!(?id, removed = doomed.len(), "subtree removed");
        Ok(())
    }

    /// Takes `id` out of its parent's child list and returns the old parent.
    /// Structure only; nothing is invalidated or reported.
    fn unlink(&mut self, id: ElementId) -> Option<ElementId> {
        let parent = self.live(id)?.parent?;
        if let Ok(el) = self.element_mut(parent) {
            el.children.retain(|c| *c != id);
        }
        if let Ok(el) = self.element_mut(id) {
            el.parent = None;
        }
        Some(parent)
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, mut id: ElementId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.live(id).and_then(|el| el.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    // =========================================================================
    // Property values
    // =========================================================================

    fn resolver(&self) -> ResolveCx<'_, ElementId, Self> {
        ResolveCx::new(&self.registry, self)
    }

    /// Returns the effective value of a property.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`PropertyError::UnknownProperty`] or [`PropertyError::TypeMismatch`]
    ///   for a handle that does not match the registry.
    pub fn get<T: PropertyValue>(
        &self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<T, ElementError> {
        self.element(id)?;
        Ok(self.resolver().get_value(id, property)?)
    }

    /// Returns the effective value of a property without its type.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get).
    pub fn get_erased(&self, id: ElementId, property: PropertyId) -> Result<&ErasedValue, ElementError> {
        self.element(id)?;
        Ok(self.resolver().get_erased(id, property)?)
    }

    /// Reports which tier supplies the effective value.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get).
    pub fn value_source(
        &self,
        id: ElementId,
        property: PropertyId,
    ) -> Result<ValueSource<ElementId>, ElementError> {
        self.element(id)?;
        Ok(self.resolver().value_source(id, property)?)
    }

    /// Returns the element's local value, if it has one.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn get_local<T: PropertyValue>(
        &self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<Option<T>, ElementError> {
        Ok(self.element(id)?.store.get_local(property).cloned())
    }

    /// Sets the element's local value.
    ///
    /// The value is coerced first. If a binding shadows the property the
    /// local slot is written silently; otherwise observers hear about the
    /// change only if the effective value actually changed.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`PropertyError::TypeMismatch`] if `T` is not the registered type.
    pub fn set_local<T: PropertyValue>(
        &mut self,
        id: ElementId,
        property: Property<T>,
        value: T,
    ) -> Result<(), ElementError> {
        self.registry.check_type(property)?;
        self.set_local_erased(id, property.id(), ErasedValue::new(value))
    }

    /// Sets the element's local value from an erased value.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`PropertyError::UnknownProperty`] if `property` is not registered.
    /// - [`PropertyError::TypeMismatch`] if the value has the wrong type.
    /// - [`ElementError::NotApplicable`] if the property is not attached and
    ///   the element's kind does not derive from its owner.
    pub fn set_local_erased(
        &mut self,
        id: ElementId,
        property: PropertyId,
        value: ErasedValue,
    ) -> Result<(), ElementError> {
        self.check_applies(id, property)?;
        self.registry.check_value(property, &value)?;
        let value = self.registry.registration(property)?.coerce(value);
        self.track_changes(id, &[property], move |tree| {
            if let Ok(el) = tree.element_mut(id) {
                el.store.set(property, value);
            }
        })
    }

    /// Owner-kind properties apply to elements of that kind and derived
    /// kinds; attached properties apply anywhere.
    fn check_applies(&self, id: ElementId, property: PropertyId) -> Result<(), ElementError> {
        let kind = self.element(id)?.kind;
        let registration = self.registry.registration(property)?;
        if registration.attached() || self.registry.is_kind_of(kind, registration.owner()) {
            Ok(())
        } else {
            Err(ElementError::NotApplicable {
                element: id,
                property,
            })
        }
    }

    /// Removes the element's local value.
    ///
    /// Returns `true` if there was one.
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`PropertyError::UnknownProperty`] if `property` is not registered.
    pub fn clear_local<T: PropertyValue>(
        &mut self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<bool, ElementError> {
        let property = property.id();
        if !self.element(id)?.store.contains(property) {
            return Ok(false);
        }
        self.track_changes(id, &[property], move |tree| {
            if let Ok(el) = tree.element_mut(id) {
                el.store.clear(property);
            }
        })?;
        Ok(true)
    }

    /// Writes a value the way user input would.
    ///
    /// With a two-way binding attached, the value goes to the binding source
    /// and this element's binding is refreshed immediately. Other bindings
    /// queued by the write, including ones on the same source, wait for the
    /// next [`process_binding_changes`](Self::process_binding_changes).
    /// Without a binding this is [`set_local`](Self::set_local).
    ///
    /// # Errors
    ///
    /// - [`PropertyError::NotTwoWay`] if the attached binding refuses writes.
    /// - Anything [`set_local`](Self::set_local) reports.
    pub fn set_value<T: PropertyValue>(
        &mut self,
        id: ElementId,
        property: Property<T>,
        value: T,
    ) -> Result<(), ElementError> {
        self.registry.check_type(property)?;
        let Some(slot) = self.element(id)?.binding(property.id()) else {
            return self.set_local(id, property, value);
        };
        if slot.binding.mode() != BindingMode::TwoWay
            || !slot.binding.write(&ErasedValue::new(value))
        {
            return Err(PropertyError::NotTwoWay {
                property: property.id(),
            }
            .into());
        }
        let property = property.id();
        self.pending
            .borrow_mut()
            .retain(|queued| *queued != (id, property));
        self.refresh_binding(id, property);
        Ok(())
    }

    /// Runs `mutate` and reports every resulting effective-value change of
    /// `properties` on `id`, including inherited changes below it.
    pub(crate) fn track_changes(
        &mut self,
        id: ElementId,
        properties: &[PropertyId],
        mutate: impl FnOnce(&mut Self),
    ) -> Result<(), ElementError> {
        let mut before = SmallVec::<[(PropertyId, ErasedValue, Option<ErasedValue>); 4]>::new();
        for &property in properties {
            let effective = self.get_erased(id, property)?.clone();
            let inheritable = self
                .registry
                .inherits(property)
                .then(|| self.inheritable_value(id, property))
                .transpose()?;
            before.push((property, effective, inheritable));
        }

        mutate(self);

        let mut after = SmallVec::<[(ErasedValue, Option<ErasedValue>); 4]>::new();
        for (property, _, inheritable) in &before {
            let Ok(effective) = self.get_erased(id, *property).cloned() else {
                return Ok(());
            };
            let inheritable = inheritable
                .as_ref()
                .and_then(|_| self.inheritable_value(id, *property).ok());
            after.push((effective, inheritable));
        }

        for ((property, old, old_inherited), (new, new_inherited)) in before.into_iter().zip(after)
        {
            if old != new {
                self.notify(id, property, &old, &new);
            }
            if let (Some(old), Some(new)) = (old_inherited, new_inherited)
                && old != new
            {
                self.propagate_inherited(id, property, &old, &new);
            }
        }
        Ok(())
    }

    fn inheriting_properties(&self) -> SmallVec<[PropertyId; 8]> {
        self.registry
            .iter()
            .filter(|(_, registration)| registration.inherits())
            .map(|(id, _)| id)
            .collect()
    }

    /// The value descendants inherit through `id`: its effective value with
    /// its own binding ignored.
    fn inheritable_value(&self, id: ElementId, property: PropertyId) -> Result<ErasedValue, ElementError> {
        let tiers = Unbound { tree: self, element: id };
        Ok(ResolveCx::new(&self.registry, &tiers)
            .get_erased(id, property)?
            .clone())
    }

    fn notify(&mut self, id: ElementId, property: PropertyId, old: &ErasedValue, new: &ErasedValue) {
        let flags = self
            .registry
            .get(property)
            .map(|registration| registration.changed(old, new))
            .unwrap_or_default();
        tracing::trace!(?id, property = self.registry.name(property), ?flags, "property changed");

        let event = PropertyChanged {
            element: id,
            property,
            old,
            new,
        };
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
        self.apply_invalidation(id, flags);
    }

    /// Notifies descendants that see `id`'s inheritable value. Descendants
    /// with a local or style value shadow it for their whole subtree; bound
    /// descendants keep their binding value but pass it on to their children.
    fn propagate_inherited(
        &mut self,
        id: ElementId,
        property: PropertyId,
        old: &ErasedValue,
        new: &ErasedValue,
    ) {
        let mut stack: Vec<ElementId> = match self.live(id) {
            Some(el) => el.children.iter().rev().copied().collect(),
            None => return,
        };
        while let Some(child) = stack.pop() {
            let Some(el) = self.live(child) else {
                continue;
            };
            if el.store.contains(property) || self.style_value(child, property).is_some() {
                continue;
            }
            let bound = el.binding(property).is_some();
            let grandchildren = el.children.clone();
            if !bound {
                self.notify(child, property, old, new);
            }
            stack.extend(grandchildren.iter().rev().copied());
        }
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Attaches a binding as the top tier of `property` on `id`, replacing
    /// any previous binding.
    ///
    /// The binding's value is read immediately. Later changes are queued by
    /// the binding's notifier and applied by
    /// [`process_binding_changes`](Self::process_binding_changes).
    ///
    /// # Errors
    ///
    /// - [`ElementError::StaleElement`] if `id` has been removed.
    /// - [`PropertyError::TypeMismatch`] if `T` is not the registered type.
    /// - [`ElementError::NotApplicable`] as for
    ///   [`set_local_erased`](Self::set_local_erased).
    pub fn attach_binding<T, B>(
        &mut self,
        id: ElementId,
        property: Property<T>,
        binding: B,
    ) -> Result<(), ElementError>
    where
        T: PropertyValue,
        B: Binding<T> + 'static,
    {
        self.registry.check_type(property)?;
        let property = property.id();
        self.check_applies(id, property)?;

        let binding = ErasedBinding::new(binding);
        let alive = Rc::new(());
        binding.subscribe(self.notifier(id, property, &alive));
        let value = self.registry.registration(property)?.coerce(binding.value());
        tracing::trace!(
            ?id,
            property = self.registry.name(property),
            mode = ?binding.mode(),
            "binding attached"
        );

        let slot = BindingSlot {
            binding,
            value,
            _alive: alive,
        };
        self.track_changes(id, &[property], move |tree| {
            if let Ok(el) = tree.element_mut(id) {
                el.set_binding(property, slot);
            }
        })
    }

    /// Detaches the binding of `property` on `id`.
    ///
    /// Returns `true` if a binding was attached.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn detach_binding<T: PropertyValue>(
        &mut self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<bool, ElementError> {
        let property = property.id();
        if self.element(id)?.binding(property).is_none() {
            return Ok(false);
        }
        self.track_changes(id, &[property], move |tree| {
            if let Ok(el) = tree.element_mut(id) {
                el.remove_binding(property);
            }
        })?;
        Ok(true)
    }

    /// Returns `true` if `property` on `id` has a binding attached.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn has_binding<T: PropertyValue>(
        &self,
        id: ElementId,
        property: Property<T>,
    ) -> Result<bool, ElementError> {
        Ok(self.element(id)?.binding(property.id()).is_some())
    }

    fn notifier(&self, id: ElementId, property: PropertyId, alive: &Rc<()>) -> ChangeNotifier {
        let queue = Rc::downgrade(&self.pending);
        let alive = Rc::downgrade(alive);
        ChangeNotifier::new(move || {
            if alive.strong_count() == 0 {
                return false;
            }
            let Some(queue) = queue.upgrade() else {
                return false;
            };
            queue.borrow_mut().push((id, property));
            true
        })
    }

    /// Pulls new values from every binding that reported a change.
    ///
    /// Changes raised while processing are handled in the same call. Returns
    /// the number of bindings whose value actually changed.
    pub fn process_binding_changes(&mut self) -> usize {
        let mut changed = 0;
        loop {
            let batch = core::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for (id, property) in batch {
                if self.refresh_binding(id, property) {
                    changed += 1;
                }
            }
        }
        changed
    }

    fn refresh_binding(&mut self, id: ElementId, property: PropertyId) -> bool {
        let Some(slot) = self.live(id).and_then(|el| el.binding(property)) else {
            return false;
        };
        let Ok(registration) = self.registry.registration(property) else {
            return false;
        };
        let value = registration.coerce(slot.binding.value());
        if value == slot.value {
            return false;
        }
        self.track_changes(id, &[property], move |tree| {
            if let Ok(el) = tree.element_mut(id)
                && let Some(slot) = el.binding_mut(property)
            {
                slot.value = value;
            }
        })
        .is_ok()
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers an observer for every effective-value change in the tree.
    pub fn observe(&mut self, observer: impl FnMut(&PropertyChanged<'_>) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer = self.next_observer.wrapping_add(1);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    // =========================================================================
    // Styles
    // =========================================================================

    /// Returns the current theme.
    #[must_use]
    #[inline]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Replaces the theme.
    ///
    /// Elements whose style was already resolved are re-resolved at once;
    /// the rest resolve lazily on first use.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme.ptr_eq(&theme) {
            return;
        }
        self.theme = theme;
        let resolved: Vec<ElementId> = self
            .iter()
            .filter(|id| self.live(*id).is_some_and(|el| el.style.is_valid()))
            .collect();
        tracing::debug!(elements = resolved.len(), "theme replaced");
        for id in resolved {
            self.restyle(id);
        }
    }

    /// Returns the element's resolved style.
    ///
    /// # Errors
    ///
    /// [`ElementError::StaleElement`] if `id` has been removed.
    pub fn style(&self, id: ElementId) -> Result<Option<Style>, ElementError> {
        let el = self.element(id)?;
        Ok(el.style.get_or_compute(|| self.lookup_style(el)).clone())
    }

    /// Looks the element's style up in the theme. The style key is read from
    /// the binding and local tiers only.
    fn lookup_style(&self, el: &Element) -> Option<Style> {
        let key = self.core.style_key.id();
        let key = el
            .binding(key)
            .map(|slot| &slot.value)
            .or_else(|| el.store.get(key))
            .and_then(ErasedValue::downcast_ref::<Option<Rc<str>>>)
            .and_then(Option::as_deref);
        self.theme.lookup(&self.registry, el.kind, key)
    }

    /// Re-resolves a resolved style and runs the style-changed transition if
    /// it differs. Pending styles are left to resolve lazily.
    pub(crate) fn restyle(&mut self, id: ElementId) -> bool {
        let Some(el) = self.live(id) else {
            return false;
        };
        let Some(old) = el.style.get().cloned() else {
            return false;
        };
        let new = self.lookup_style(el);
        let unchanged = match (&old, &new) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        if unchanged {
            return false;
        }
        tracing::debug!(?id, "style changed");

        let mut properties = SmallVec::<[PropertyId; 8]>::new();
        for style in old.iter().chain(new.iter()) {
            collect_style_properties(style, &mut properties);
        }
        let old_renderer = old.as_ref().and_then(|style| style.renderer().cloned());
        self.track_changes(id, &properties, move |tree| {
            if let Ok(el) = tree.element_mut(id) {
                el.style.set(new);
            }
            tree.release_resource_with(id, old_renderer);
            tree.invalidate_paint_resources(id);
        })
        .is_ok()
    }
}

fn collect_style_properties(style: &Style, out: &mut SmallVec<[PropertyId; 8]>) {
    let mut current = Some(style);
    while let Some(style) = current {
        for id in style.property_ids() {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        current = style.based_on();
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "slot count never exceeds the u32 serial counter"
)]
fn slot_index(slot: usize) -> u32 {
    slot as u32
}

impl ValueTiers<ElementId> for ElementTree {
    fn binding_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        self.live(key)?.binding(id).map(|slot| &slot.value)
    }

    fn local_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        self.live(key)?.store.get(id)
    }

    fn style_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        let el = self.live(key)?;
        el.style
            .get_or_compute(|| self.lookup_style(el))
            .as_ref()?
            .get_erased(id)
    }

    fn parent(&self, key: ElementId) -> Option<ElementId> {
        self.live(key)?.parent
    }
}

/// Tier view that hides one element's binding.
struct Unbound<'a> {
    tree: &'a ElementTree,
    element: ElementId,
}

impl ValueTiers<ElementId> for Unbound<'_> {
    fn binding_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        if key == self.element {
            None
        } else {
            self.tree.binding_value(key, id)
        }
    }

    fn local_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        self.tree.local_value(key, id)
    }

    fn style_value(&self, key: ElementId, id: PropertyId) -> Option<&ErasedValue> {
        self.tree.style_value(key, id)
    }

    fn parent(&self, key: ElementId) -> Option<ElementId> {
        self.tree.live(key)?.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::Dock;
    use alloc::vec;
    use core::cell::Cell;
    use understory_property::{BindingSource, Invalidation, PropertyMetadataBuilder};

    struct Fixture {
        tree: ElementTree,
        element: KindId,
        font_size: Property<f64>,
        label: Property<i32>,
    }

    fn fixture() -> Fixture {
        let mut registry = PropertyRegistry::new();
        let core = CoreProperties::register(&mut registry).unwrap();
        let element = core.element;
        let font_size = registry
            .register(
                "FontSize",
                element,
                PropertyMetadataBuilder::new(12.0_f64)
                    .inherits(true)
                    .affects(Invalidation::MEASURE)
                    .build(),
            )
            .unwrap();
        let label = registry
            .register(
                "Label",
                element,
                PropertyMetadataBuilder::new(0_i32)
                    .coerce(|v: i32| v.clamp(0, 100))
                    .build(),
            )
            .unwrap();
        Fixture {
            tree: ElementTree::new(registry, core),
            element,
            font_size,
            label,
        }
    }

    #[test]
    fn removed_ids_are_stale_and_never_alias() {
        let Fixture { mut tree, element, .. } = fixture();
        let a = tree.create(element).unwrap();
        tree.remove(a).unwrap();
        let b = tree.create(element).unwrap();

        // The slot is reused with a fresh serial.
        assert_eq!(a.slot, b.slot);
        assert_ne!(a, b);
        assert!(b > a);
        assert!(!tree.is_alive(a));
        assert_eq!(tree.kind(a), Err(ElementError::StaleElement(a)));
        assert_eq!(tree.remove(a), Err(ElementError::StaleElement(a)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_takes_the_subtree() {
        let Fixture { mut tree, element, .. } = fixture();
        let root = tree.create(element).unwrap();
        let mid = tree.create(element).unwrap();
        let leaf = tree.create(element).unwrap();
        tree.append_child(root, mid).unwrap();
        tree.append_child(mid, leaf).unwrap();

        tree.remove(mid).unwrap();
        assert_eq!(tree.children(root).unwrap(), &[] as &[ElementId]);
        assert!(!tree.is_alive(leaf));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.iter().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn insert_rejects_cycles_and_reparents() {
        let Fixture { mut tree, element, .. } = fixture();
        let a = tree.create(element).unwrap();
        let b = tree.create(element).unwrap();
        let c = tree.create(element).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(b, c).unwrap();

        assert_eq!(
            tree.append_child(c, a),
            Err(ElementError::InvalidHierarchy { parent: c, child: a })
        );
        assert_eq!(
            tree.append_child(a, a),
            Err(ElementError::InvalidHierarchy { parent: a, child: a })
        );

        tree.insert_child(a, 0, c).unwrap();
        assert_eq!(tree.children(a).unwrap(), &[c, b]);
        assert!(tree.children(b).unwrap().is_empty());
        assert_eq!(tree.parent(c), Ok(Some(a)));

        tree.detach(c).unwrap();
        assert_eq!(tree.parent(c), Ok(None));
        assert_eq!(tree.children(a).unwrap(), &[b]);
    }

    #[test]
    fn reparenting_reports_inherited_changes() {
        let Fixture {
            mut tree,
            element,
            font_size,
            ..
        } = fixture();
        let a = tree.create(element).unwrap();
        let b = tree.create(element).unwrap();
        let holder = tree.create(element).unwrap();
        let leaf = tree.create(element).unwrap();
        let shadowed = tree.create(element).unwrap();
        tree.set_local(b, font_size, 40.0).unwrap();
        tree.set_local(shadowed, font_size, 8.0).unwrap();
        tree.append_child(a, holder).unwrap();
        tree.append_child(holder, leaf).unwrap();
        tree.append_child(holder, shadowed).unwrap();

        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        tree.observe(move |change| {
            sink.borrow_mut()
                .push((change.element, *change.new.downcast_ref::<f64>().unwrap()));
        });

        tree.append_child(b, holder).unwrap();
        assert_eq!(*hits.borrow(), vec![(holder, 40.0), (leaf, 40.0)]);
        assert_eq!(tree.get(leaf, font_size), Ok(40.0));
        assert_eq!(
            tree.value_source(leaf, font_size.id()),
            Ok(ValueSource::Inherited(b))
        );

        // Reordering under the same parent changes nothing.
        hits.borrow_mut().clear();
        tree.insert_child(holder, 0, shadowed).unwrap();
        assert!(hits.borrow().is_empty());

        tree.detach(holder).unwrap();
        assert_eq!(*hits.borrow(), vec![(holder, 12.0), (leaf, 12.0)]);
        assert_eq!(tree.get(leaf, font_size), Ok(12.0));
        assert_eq!(tree.get(shadowed, font_size), Ok(8.0));

        // Removal is silent.
        hits.borrow_mut().clear();
        tree.append_child(b, holder).unwrap();
        hits.borrow_mut().clear();
        tree.remove(holder).unwrap();
        assert!(hits.borrow().is_empty());
    }

    #[test]
    fn owned_properties_apply_to_derived_kinds_only() {
        let mut registry = PropertyRegistry::new();
        let core = CoreProperties::register(&mut registry).unwrap();
        let spacing = registry
            .register(
                "Spacing",
                core.stack_panel,
                PropertyMetadataBuilder::new(0.0_f64).build(),
            )
            .unwrap();
        let mut tree = ElementTree::new(registry, core.clone());
        let plain = tree.create(core.element).unwrap();
        let stack = tree.create(core.stack_panel).unwrap();

        assert_eq!(
            tree.set_local(plain, spacing, 4.0),
            Err(ElementError::NotApplicable {
                element: plain,
                property: spacing.id()
            })
        );
        assert_eq!(
            tree.attach_binding(plain, spacing, BindingSource::new(1.0).one_way()),
            Err(ElementError::NotApplicable {
                element: plain,
                property: spacing.id()
            })
        );
        assert_eq!(tree.get_local(plain, spacing), Ok(None));
        tree.set_local(stack, spacing, 4.0).unwrap();
        assert_eq!(tree.get(stack, spacing), Ok(4.0));

        // Attached properties go anywhere, and base-kind properties reach
        // derived kinds.
        tree.set_local(plain, core.dock, Dock::Top).unwrap();
        assert_eq!(tree.get(plain, core.dock), Ok(Dock::Top));
        tree.set_local(stack, core.width, Some(10.0)).unwrap();
    }

    #[test]
    fn local_values_are_coerced_and_type_checked() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let e = tree.create(element).unwrap();

        tree.set_local(e, label, 500).unwrap();
        assert_eq!(tree.get(e, label), Ok(100));
        assert_eq!(tree.get_local(e, label), Ok(Some(100)));

        let err = tree.set_local_erased(e, label.id(), ErasedValue::new(1.5_f64));
        assert!(matches!(
            err,
            Err(ElementError::Property(PropertyError::TypeMismatch { .. }))
        ));
        assert_eq!(tree.get(e, label), Ok(100));

        assert_eq!(tree.clear_local(e, label), Ok(true));
        assert_eq!(tree.clear_local(e, label), Ok(false));
        assert_eq!(tree.value_source(e, label.id()), Ok(ValueSource::Default));
    }

    #[test]
    fn observers_see_effective_changes_only() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let e = tree.create(element).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let observer = tree.observe(move |change| {
            sink.borrow_mut().push((
                change.element,
                *change.old.downcast_ref::<i32>().unwrap(),
                *change.new.downcast_ref::<i32>().unwrap(),
            ));
        });

        tree.set_local(e, label, 3).unwrap();
        tree.set_local(e, label, 3).unwrap();
        // Default is 0, so setting it explicitly changes nothing observable.
        tree.clear_local(e, label).unwrap();
        tree.set_local(e, label, 0).unwrap();
        assert_eq!(*seen.borrow(), vec![(e, 0, 3), (e, 3, 0)]);

        assert!(tree.unobserve(observer));
        assert!(!tree.unobserve(observer));
        tree.set_local(e, label, 9).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn inherited_change_reaches_non_shadowing_descendants() {
        let Fixture {
            mut tree,
            element,
            font_size,
            ..
        } = fixture();
        let root = tree.create(element).unwrap();
        let shadow = tree.create(element).unwrap();
        let under_shadow = tree.create(element).unwrap();
        let plain = tree.create(element).unwrap();
        tree.append_child(root, shadow).unwrap();
        tree.append_child(shadow, under_shadow).unwrap();
        tree.append_child(root, plain).unwrap();
        tree.set_local(shadow, font_size, 8.0).unwrap();

        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        tree.observe(move |change| sink.borrow_mut().push(change.element));

        tree.set_local(root, font_size, 20.0).unwrap();
        assert_eq!(*hits.borrow(), vec![root, plain]);
        assert_eq!(tree.get(plain, font_size), Ok(20.0));
        assert_eq!(tree.get(under_shadow, font_size), Ok(8.0));
        assert_eq!(
            tree.value_source(plain, font_size.id()),
            Ok(ValueSource::Inherited(root))
        );
    }

    #[test]
    fn bound_descendant_passes_inheritance_on() {
        let Fixture {
            mut tree,
            element,
            font_size,
            ..
        } = fixture();
        let root = tree.create(element).unwrap();
        let bound = tree.create(element).unwrap();
        let leaf = tree.create(element).unwrap();
        tree.append_child(root, bound).unwrap();
        tree.append_child(bound, leaf).unwrap();
        tree.attach_binding(bound, font_size, BindingSource::new(30.0).one_way())
            .unwrap();

        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        tree.observe(move |change| sink.borrow_mut().push(change.element));

        tree.set_local(root, font_size, 16.0).unwrap();
        assert_eq!(*hits.borrow(), vec![root, leaf]);
        assert_eq!(tree.get(bound, font_size), Ok(30.0));
        // Bindings are not inherited.
        assert_eq!(tree.get(leaf, font_size), Ok(16.0));
    }

    #[test]
    fn binding_shadows_local_writes() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let e = tree.create(element).unwrap();
        let source = BindingSource::new(7);
        tree.attach_binding(e, label, source.one_way()).unwrap();

        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        tree.observe(move |_| sink.set(sink.get() + 1));

        tree.set_local(e, label, 50).unwrap();
        assert_eq!(count.get(), 0);
        assert_eq!(tree.get(e, label), Ok(7));

        source.set(8);
        assert_eq!(tree.get(e, label), Ok(7), "changes wait for processing");
        assert_eq!(tree.process_binding_changes(), 1);
        assert_eq!(tree.get(e, label), Ok(8));
        assert_eq!(count.get(), 1);

        assert_eq!(tree.detach_binding(e, label), Ok(true));
        assert_eq!(tree.get(e, label), Ok(50));
        assert_eq!(tree.value_source(e, label.id()), Ok(ValueSource::Local));
        assert_eq!(count.get(), 2);

        // Detached bindings no longer notify.
        source.set(9);
        assert_eq!(tree.process_binding_changes(), 0);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn binding_values_are_coerced() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let e = tree.create(element).unwrap();
        let source = BindingSource::new(-4);
        tree.attach_binding(e, label, source.two_way()).unwrap();
        assert_eq!(tree.get(e, label), Ok(0));

        tree.set_value(e, label, 1_000).unwrap();
        assert_eq!(source.get(), 1_000);
        assert_eq!(tree.get(e, label), Ok(100));
    }

    #[test]
    fn set_value_refreshes_only_the_written_binding() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let first = tree.create(element).unwrap();
        let second = tree.create(element).unwrap();
        let other = tree.create(element).unwrap();
        let shared = BindingSource::new(7);
        let unrelated = BindingSource::new(1);
        tree.attach_binding(first, label, shared.two_way()).unwrap();
        tree.attach_binding(second, label, shared.two_way()).unwrap();
        tree.attach_binding(other, label, unrelated.one_way()).unwrap();

        unrelated.set(2);
        tree.set_value(first, label, 40).unwrap();
        assert_eq!(shared.get(), 40);
        assert_eq!(tree.get(first, label), Ok(40));
        assert_eq!(tree.get(second, label), Ok(7));
        assert_eq!(tree.get(other, label), Ok(1));

        assert_eq!(tree.process_binding_changes(), 2);
        assert_eq!(tree.get(second, label), Ok(40));
        assert_eq!(tree.get(other, label), Ok(2));
    }

    #[test]
    fn removed_element_drops_pending_binding_changes() {
        let Fixture {
            mut tree,
            element,
            label,
            ..
        } = fixture();
        let e = tree.create(element).unwrap();
        let source = BindingSource::new(1);
        tree.attach_binding(e, label, source.one_way()).unwrap();
        source.set(2);
        tree.remove(e).unwrap();
        assert_eq!(tree.process_binding_changes(), 0);
    }
}
