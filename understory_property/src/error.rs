// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the property system.

use core::fmt;

use crate::id::{KindId, PropertyId};

/// Caller-contract violations reported by the property system.
///
/// None of these are retried or recovered internally; the failing call
/// leaves all state unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyError {
    /// A property (or kind) with the same identity is already registered.
    DuplicateRegistration {
        /// The owning kind, or `None` when a kind name was registered twice.
        owner: Option<KindId>,
        /// The duplicated name.
        name: &'static str,
    },
    /// A value's type is not the property's declared type.
    TypeMismatch {
        /// The property being read or written.
        property: PropertyId,
        /// The declared value type.
        expected: &'static str,
        /// The type that was supplied or requested.
        found: &'static str,
    },
    /// A write was routed through a binding that is not two-way.
    NotTwoWay {
        /// The bound property.
        property: PropertyId,
    },
    /// The property id is not known to the registry.
    UnknownProperty(PropertyId),
    /// The kind id is not known to the registry.
    UnknownKind(KindId),
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration {
                owner: Some(owner),
                name,
            } => write!(f, "property '{name}' is already registered on {owner:?}"),
            Self::DuplicateRegistration { owner: None, name } => {
                write!(f, "kind '{name}' is already registered")
            }
            Self::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "{property} holds values of type {expected}, not {found}"
            ),
            Self::NotTwoWay { property } => {
                write!(f, "the binding on {property} is not two-way")
            }
            Self::UnknownProperty(id) => write!(f, "{id} is not registered"),
            Self::UnknownKind(id) => write!(f, "{id:?} is not registered"),
        }
    }
}

impl core::error::Error for PropertyError {}
