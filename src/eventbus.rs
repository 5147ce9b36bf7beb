use crate::event::{Notification, NotificationKind};
use std::collections::BTreeMap;
use std::sync::mpsc;

/// Trait for reacting to manager notifications.
pub trait NotificationListener: Send {
    fn on_notification(&mut self, notification: &Notification);
}

/// Forward notifications to another thread. A hung-up receiver is ignored.
impl NotificationListener for mpsc::Sender<Notification> {
    fn on_notification(&mut self, notification: &Notification) {
        let _ = self.send(notification.clone());
    }
}

/// Determines which notifications a listener wants to receive.
#[derive(Debug, Clone, Copy)]
pub enum NotificationFilter {
    All,
    /// Connected, disconnected and read-failure closes.
    ConnectionChanges,
    /// Connect failures, capacity exhaustion and read-failure closes.
    Problems,
    Only(NotificationKind),
    Custom(fn(&Notification) -> bool),
}

impl NotificationFilter {
    fn accepts(&self, notification: &Notification) -> bool {
        let kind = notification.kind();
        match self {
            NotificationFilter::All => true,
            NotificationFilter::ConnectionChanges => matches!(
                kind,
                NotificationKind::Connected
                    | NotificationKind::Disconnected
                    | NotificationKind::ReadFailureClosed
            ),
            NotificationFilter::Problems => matches!(
                kind,
                NotificationKind::ConnectFailed
                    | NotificationKind::CapacityExceeded
                    | NotificationKind::ReadFailureClosed
            ),
            NotificationFilter::Only(wanted) => kind == *wanted,
            NotificationFilter::Custom(f) => f(notification),
        }
    }
}

struct ListenerEntry {
    listener: Box<dyn NotificationListener>,
    enabled: bool,
    filter: NotificationFilter,
    controller: Option<usize>, // only this controller id; pool-wide events always pass
}

/// Listener registry. Dispatch order is registration order.
#[derive(Default)]
pub struct NotificationBus {
    next_id: u64,
    listeners: BTreeMap<u64, ListenerEntry>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with a filter and an optional controller-id tag.
    pub fn add_listener(
        &mut self,
        listener: impl NotificationListener + 'static,
        filter: NotificationFilter,
        controller: Option<usize>,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
                controller,
            },
        );
        self.next_id += 1;
        id
    }

    /// Resume delivery to listener `id`.
    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Stop delivering to `id` but keep its registration.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    /// Drop listener `id`. Unknown ids are ignored.
    pub fn remove_listener(&mut self, id: u64) {
        self.listeners.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers one notification to all active and matching listeners.
    pub fn emit(&mut self, notification: &Notification) {
        for entry in self.listeners.values_mut() {
            if !entry.enabled {
                continue;
            }

            if let (Some(wanted), Some(actual)) = (entry.controller, notification.controller_id()) {
                if wanted != actual {
                    continue;
                }
            }

            if entry.filter.accepts(notification) {
                entry.listener.on_notification(notification);
            }
        }
    }
}
