//! Notifications produced by the manager.
//!
//! Notifications are best-effort: they are logged through `tracing` when emitted and handed to
//! every matching listener on the [`NotificationBus`](crate::eventbus::NotificationBus), but there
//! is no delivery guarantee and nothing is queued for late subscribers.
//!
//! ## Controller ids
//! `controller_id` is the slot position at the time of the event. Ids can change while a device
//! stays connected (see [`Notification::Reassigned`]).

use crate::device::DeviceIdentity;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A still-connected device moved to a different slot because the bus enumeration order
    /// changed.
    Reassigned {
        identity: DeviceIdentity,
        from: usize,
        to: usize,
    },

    /// A newly enumerated device was opened into a slot.
    Connected {
        controller_id: usize,
        identity: DeviceIdentity,
    },

    /// An open device vanished from enumeration and its slot was closed by reconciliation.
    ///
    /// Rare: a read failure usually closes the slot first.
    Disconnected {
        controller_id: usize,
        identity: DeviceIdentity,
    },

    /// A newly enumerated device could not be opened. It is retried on the next pass.
    ConnectFailed {
        controller_id: usize,
        identity: DeviceIdentity,
        reason: String,
    },

    /// More devices are attached than there are slots.
    CapacityExceeded {
        capacity: usize,
        unmanaged: Vec<DeviceIdentity>,
    },

    /// A read failed during polling and the slot was closed.
    ReadFailureClosed {
        controller_id: usize,
        identity: DeviceIdentity,
        reason: String,
    },
}

/// Coarse grouping used by listener filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Reassigned,
    Connected,
    Disconnected,
    ConnectFailed,
    CapacityExceeded,
    ReadFailureClosed,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Reassigned { .. } => NotificationKind::Reassigned,
            Notification::Connected { .. } => NotificationKind::Connected,
            Notification::Disconnected { .. } => NotificationKind::Disconnected,
            Notification::ConnectFailed { .. } => NotificationKind::ConnectFailed,
            Notification::CapacityExceeded { .. } => NotificationKind::CapacityExceeded,
            Notification::ReadFailureClosed { .. } => NotificationKind::ReadFailureClosed,
        }
    }

    /// Controller id the notification is about. `None` for pool-wide events.
    pub fn controller_id(&self) -> Option<usize> {
        match self {
            Notification::Reassigned { to, .. } => Some(*to),
            Notification::Connected { controller_id, .. }
            | Notification::Disconnected { controller_id, .. }
            | Notification::ConnectFailed { controller_id, .. }
            | Notification::ReadFailureClosed { controller_id, .. } => Some(*controller_id),
            Notification::CapacityExceeded { .. } => None,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Reassigned { identity, from, to } => {
                write!(f, "controller {from} moved to controller {to} ({identity})")
            }
            Notification::Connected {
                controller_id,
                identity,
            } => write!(f, "controller {controller_id} connected ({identity})"),
            Notification::Disconnected {
                controller_id,
                identity,
            } => write!(
                f,
                "controller {controller_id} closed, {identity} is no longer in the device list"
            ),
            Notification::ConnectFailed {
                controller_id,
                identity,
                reason,
            } => write!(
                f,
                "controller {controller_id} failed to open {identity}: {reason}"
            ),
            Notification::CapacityExceeded {
                capacity,
                unmanaged,
            } => write!(
                f,
                "can't connect {} more controller(s), all {capacity} slots are in use",
                unmanaged.len()
            ),
            Notification::ReadFailureClosed {
                controller_id,
                identity,
                reason,
            } => write!(
                f,
                "controller {controller_id} ({identity}) closing due to failed read: {reason}"
            ),
        }
    }
}
