// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element identifiers.

use core::fmt;

/// Identifier for an element in an [`ElementTree`](crate::ElementTree).
///
/// This is a small, copyable handle. It consists of a slot index and a
/// serial number.
///
/// ## Semantics
///
/// - Every created element receives the next serial from a tree-wide counter,
///   so serials are assigned monotonically and never repeat within a tree.
/// - On remove, the slot is freed; any existing `ElementId` for it is now stale.
/// - A reused slot gets a new serial, so stale handles never alias a live
///   element. Operations on stale handles report
///   [`ElementError::StaleElement`](crate::ElementError::StaleElement).
///
/// `ElementId`s order by serial, i.e. by creation order.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ElementId {
    pub(crate) slot: u32,
    pub(crate) serial: u32,
}

impl ElementId {
    pub(crate) const fn new(slot: u32, serial: u32) -> Self {
        Self { slot, serial }
    }

    pub(crate) const fn idx(self) -> usize {
        self.slot as usize
    }

    /// Returns the creation serial of this element.
    #[must_use]
    #[inline]
    pub const fn serial(self) -> u32 {
        self.serial
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.serial.cmp(&other.serial)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}#{})", self.slot, self.serial)
    }
}
