//! Fixed-capacity pool of controller sessions.
//!
//! The table is allocated once with `N` sessions and never grows or shrinks. Reconciliation
//! moves the session objects between positions and rebinds them; it never creates or frees one.

use crate::session::ControllerSession;
use crate::snapshot::{SlotView, TableSnapshot};

pub struct SlotTable {
    sessions: Vec<ControllerSession>,
}

impl SlotTable {
    /// `capacity` closed sessions, labeled `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: (0..capacity).map(ControllerSession::new).collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.sessions.len()
    }

    pub fn get(&self, slot: usize) -> Option<&ControllerSession> {
        self.sessions.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut ControllerSession> {
        self.sessions.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerSession> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ControllerSession> {
        self.sessions.iter_mut()
    }

    pub fn open_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_open()).count()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot(
            self.sessions
                .iter()
                .map(|s| SlotView {
                    controller_id: s.slot_id(),
                    identity: s.identity().cloned(),
                    connected: s.is_open(),
                })
                .collect(),
        )
    }

    /// Move every session out, leaving the table empty until [`SlotTable::restore`].
    pub(crate) fn take_all(&mut self) -> Vec<Option<ControllerSession>> {
        self.sessions.drain(..).map(Some).collect()
    }

    pub(crate) fn restore(&mut self, sessions: Vec<ControllerSession>) {
        debug_assert!(self.sessions.is_empty());
        self.sessions = sessions;
    }
}
