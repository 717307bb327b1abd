// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by element trees.

use core::fmt;

use understory_property::{PropertyError, PropertyId};

use crate::id::ElementId;

/// Caller-contract violations reported by an [`ElementTree`](crate::ElementTree).
///
/// A failing call leaves the tree unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementError {
    /// A property-system error (unknown property, type mismatch, writing
    /// through a one-way binding, ...).
    Property(PropertyError),
    /// The element has no paint resource, or it is not of the requested type.
    ResourceNotFound(ElementId),
    /// The handle refers to an element that has been removed.
    StaleElement(ElementId),
    /// The requested parent/child link would make an element its own
    /// ancestor.
    InvalidHierarchy {
        /// The proposed parent.
        parent: ElementId,
        /// The proposed child.
        child: ElementId,
    },
    /// A non-attached property was written on an element whose kind does
    /// not derive from the property's owner.
    NotApplicable {
        /// The element written to.
        element: ElementId,
        /// The property.
        property: PropertyId,
    },
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(err) => fmt::Display::fmt(err, f),
            Self::ResourceNotFound(id) => write!(f, "no paint resource for {id:?}"),
            Self::StaleElement(id) => write!(f, "{id:?} has been removed"),
            Self::InvalidHierarchy { parent, child } => {
                write!(f, "{child:?} cannot become a child of its descendant {parent:?}")
            }
            Self::NotApplicable { element, property } => {
                write!(f, "{property:?} is neither attached nor owned by the kind of {element:?}")
            }
        }
    }
}

impl core::error::Error for ElementError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Property(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PropertyError> for ElementError {
    fn from(err: PropertyError) -> Self {
        Self::Property(err)
    }
}
