//! Owned copy of the slot table.
//!
//! The manager is the only writer of its sessions. Anything else that wants to know which
//! controller sits in which slot (a request handler answering "list controllers", a UI) reads a
//! [`TableSnapshot`] instead of the live sessions.
//!
//! # Semantics
//! - Entries are in slot order; `controller_id` equals the entry's index.
//! - A snapshot is **immutable** and does not track later reconciliation passes.
//!
//! # Example
//! ```no_run
//! use movepool::TableSnapshot;
//!
//! fn print_slots(snap: &TableSnapshot) {
//!     for view in snap.connected() {
//!         println!("controller {} -> {:?}", view.controller_id, view.identity);
//!     }
//! }
//! ```

use crate::device::DeviceIdentity;

/// State of one slot at snapshot time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotView {
    pub controller_id: usize,
    /// Bound device, `None` when the slot is closed.
    pub identity: Option<DeviceIdentity>,
    pub connected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableSnapshot(pub Vec<SlotView>);

impl TableSnapshot {
    #[inline]
    pub fn get(&self, controller_id: usize) -> Option<&SlotView> {
        self.0.get(controller_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotView> {
        self.0.iter()
    }

    /// Only the slots that are currently bound to a device.
    pub fn connected(&self) -> impl Iterator<Item = &SlotView> {
        self.0.iter().filter(|v| v.connected)
    }

    /// Controller id currently assigned to `identity`.
    pub fn controller_for(&self, identity: &DeviceIdentity) -> Option<usize> {
        self.connected()
            .find(|v| v.identity.as_ref() == Some(identity))
            .map(|v| v.controller_id)
    }

    #[inline]
    pub fn into_inner(self) -> Vec<SlotView> {
        self.0
    }
}
