//! Hot-plug reconciliation.
//!
//! Brings the [`SlotTable`] in line with a fresh enumeration snapshot in one deterministic pass:
//!
//! 1. Walk the snapshot in order. Enumeration position `p` becomes controller id `p`.
//!    - A device already open in some session keeps that session, which moves to `p`
//!      (a [`Notification::Reassigned`] is emitted if its id changed).
//!    - A new device takes the lowest-indexed closed session still in the old table and is
//!      opened there. A failed open still consumes position `p` for this pass.
//!    - If no closed session is left, the rest of the snapshot is left unmanaged.
//! 2. Sessions never claimed in step 1 are closed if still open, then appended after the
//!    claimed ones in their old order, taking the next free ids.
//!
//! Sessions are moved, never created or dropped, so the table holds the same `N` objects
//! before and after. Running the pass twice against the same snapshot changes nothing the
//! second time.

use crate::device::{DeviceIdentity, Transport};
use crate::event::Notification;
use crate::session::ControllerSession;
use crate::slots::SlotTable;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Run one reconciliation pass and return the notifications it produced, in order.
pub fn reconcile<T: Transport + ?Sized>(
    table: &mut SlotTable,
    snapshot: &[DeviceIdentity],
    transport: &mut T,
) -> Vec<Notification> {
    let capacity = table.capacity();
    let mut notifications = Vec::new();

    let mut old = table.take_all();
    let mut next: Vec<Option<ControllerSession>> = (0..capacity).map(|_| None).collect();
    let mut position = 0usize;

    let identities = dedup_preserving_order(snapshot);

    for (index, identity) in identities.iter().enumerate() {
        if let Some(old_index) = find_open(&old, identity) {
            let Some(mut session) = old[old_index].take() else {
                continue;
            };
            if session.slot_id() != position {
                notifications.push(Notification::Reassigned {
                    identity: (*identity).clone(),
                    from: session.slot_id(),
                    to: position,
                });
                session.set_slot_id(position);
            }
            next[position] = Some(session);
        } else if let Some(old_index) = find_first_closed(&old) {
            let Some(mut session) = old[old_index].take() else {
                continue;
            };
            session.set_slot_id(position);
            match session.open(transport, identity) {
                Ok(()) => notifications.push(Notification::Connected {
                    controller_id: position,
                    identity: (*identity).clone(),
                }),
                Err(err) => notifications.push(Notification::ConnectFailed {
                    controller_id: position,
                    identity: (*identity).clone(),
                    reason: err.to_string(),
                }),
            }
            next[position] = Some(session);
        } else {
            notifications.push(Notification::CapacityExceeded {
                capacity,
                unmanaged: identities[index..].iter().map(|id| (*id).clone()).collect(),
            });
            break;
        }

        position += 1;
    }

    // Anything left in `old` was not enumerated this pass.
    for mut session in old.iter_mut().filter_map(Option::take) {
        if let Some(identity) = session.close() {
            notifications.push(Notification::Disconnected {
                controller_id: session.slot_id(),
                identity,
            });
        }
        trace!(from = session.slot_id(), to = position, "relabeling idle session");
        session.set_slot_id(position);
        next[position] = Some(session);
        position += 1;
    }

    let sessions: Vec<ControllerSession> = next.into_iter().flatten().collect();
    debug_assert_eq!(sessions.len(), capacity);
    table.restore(sessions);

    notifications
}

fn dedup_preserving_order(snapshot: &[DeviceIdentity]) -> Vec<&DeviceIdentity> {
    let mut seen = HashSet::with_capacity(snapshot.len());
    snapshot
        .iter()
        .filter(|identity| {
            let first = seen.insert(*identity);
            if !first {
                debug!(%identity, "duplicate identity in device snapshot ignored");
            }
            first
        })
        .collect()
}

fn find_open(old: &[Option<ControllerSession>], identity: &DeviceIdentity) -> Option<usize> {
    old.iter()
        .position(|slot| slot.as_ref().is_some_and(|s| s.matches(identity)))
}

fn find_first_closed(old: &[Option<ControllerSession>]) -> Option<usize> {
    old.iter()
        .position(|slot| slot.as_ref().is_some_and(|s| !s.is_open()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_bus::{VirtualBus, VirtualTransport};
    use crate::snapshot::TableSnapshot;

    fn ids(names: &[&str]) -> Vec<DeviceIdentity> {
        names.iter().map(|n| DeviceIdentity::from(*n)).collect()
    }

    struct Rig {
        bus: VirtualBus,
        transport: VirtualTransport,
        table: SlotTable,
    }

    impl Rig {
        fn new(capacity: usize) -> Self {
            let bus = VirtualBus::new();
            Self {
                transport: VirtualTransport::new(bus.clone()),
                bus,
                table: SlotTable::new(capacity),
            }
        }

        fn plug(&self, names: &[&str]) {
            self.bus.set_order(names.iter().copied());
        }

        fn pass(&mut self, names: &[&str]) -> Vec<Notification> {
            reconcile(&mut self.table, &ids(names), &mut self.transport)
        }

        fn bound(&self) -> Vec<Option<String>> {
            self.table
                .iter()
                .map(|s| s.identity().map(|i| i.to_string()))
                .collect()
        }

        fn assert_labels_match_positions(&self) {
            for (index, session) in self.table.iter().enumerate() {
                assert_eq!(session.slot_id(), index);
            }
        }
    }

    #[test]
    fn new_devices_fill_slots_in_enumeration_order() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b"]);
        let notes = rig.pass(&["a", "b"]);

        assert_eq!(
            notes,
            vec![
                Notification::Connected {
                    controller_id: 0,
                    identity: "a".into()
                },
                Notification::Connected {
                    controller_id: 1,
                    identity: "b".into()
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![Some("a".to_string()), Some("b".to_string()), None]
        );
        rig.assert_labels_match_positions();
    }

    #[test]
    fn unchanged_snapshot_is_a_no_op() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b"]);
        rig.pass(&["a", "b"]);
        let before: TableSnapshot = rig.table.snapshot();

        let notes = rig.pass(&["a", "b"]);
        assert!(notes.is_empty());
        assert_eq!(rig.table.snapshot(), before);
        assert_eq!(rig.bus.open_handles(), 2);
    }

    #[test]
    fn reordering_moves_sessions_and_reports_each_move_once() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b", "c"]);
        rig.pass(&["a", "b", "c"]);

        rig.plug(&["c", "a", "b"]);
        let notes = rig.pass(&["c", "a", "b"]);

        assert_eq!(
            notes,
            vec![
                Notification::Reassigned {
                    identity: "c".into(),
                    from: 2,
                    to: 0
                },
                Notification::Reassigned {
                    identity: "a".into(),
                    from: 0,
                    to: 1
                },
                Notification::Reassigned {
                    identity: "b".into(),
                    from: 1,
                    to: 2
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![
                Some("c".to_string()),
                Some("a".to_string()),
                Some("b".to_string())
            ]
        );
        assert_eq!(rig.bus.open_handles(), 3);
        rig.assert_labels_match_positions();

        // moved again with the same order: nothing to report
        assert!(rig.pass(&["c", "a", "b"]).is_empty());
    }

    #[test]
    fn reordered_plus_new_device() {
        let mut rig = Rig::new(2);
        rig.plug(&["a"]);
        rig.pass(&["a"]);

        rig.plug(&["b", "a"]);
        let notes = rig.pass(&["b", "a"]);

        assert_eq!(
            notes,
            vec![
                Notification::Connected {
                    controller_id: 0,
                    identity: "b".into()
                },
                Notification::Reassigned {
                    identity: "a".into(),
                    from: 0,
                    to: 1
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![Some("b".to_string()), Some("a".to_string())]
        );
        rig.assert_labels_match_positions();
    }

    #[test]
    fn empty_snapshot_closes_everything_in_slot_order() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b"]);
        rig.pass(&["a", "b"]);

        rig.plug(&[]);
        let notes = rig.pass(&[]);

        assert_eq!(
            notes,
            vec![
                Notification::Disconnected {
                    controller_id: 0,
                    identity: "a".into()
                },
                Notification::Disconnected {
                    controller_id: 1,
                    identity: "b".into()
                },
            ]
        );
        assert_eq!(rig.table.open_count(), 0);
        assert_eq!(rig.bus.open_handles(), 0);
        rig.assert_labels_match_positions();
    }

    #[test]
    fn vanished_device_is_closed_and_appended_after_survivors() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b", "c"]);
        rig.pass(&["a", "b", "c"]);

        rig.plug(&["b", "c"]);
        let notes = rig.pass(&["b", "c"]);

        assert_eq!(
            notes,
            vec![
                Notification::Reassigned {
                    identity: "b".into(),
                    from: 1,
                    to: 0
                },
                Notification::Reassigned {
                    identity: "c".into(),
                    from: 2,
                    to: 1
                },
                Notification::Disconnected {
                    controller_id: 0,
                    identity: "a".into()
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![Some("b".to_string()), Some("c".to_string()), None]
        );
        rig.assert_labels_match_positions();
    }

    #[test]
    fn capacity_exhaustion_keeps_processed_positions() {
        let mut rig = Rig::new(2);
        rig.plug(&["a", "b", "c", "d"]);
        let notes = rig.pass(&["a", "b", "c", "d"]);

        assert_eq!(notes.len(), 3);
        assert_eq!(
            notes[2],
            Notification::CapacityExceeded {
                capacity: 2,
                unmanaged: ids(&["c", "d"]),
            }
        );
        assert_eq!(rig.table.capacity(), 2);
        assert_eq!(rig.table.open_count(), 2);
        assert_eq!(
            rig.bound(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn new_device_ahead_of_a_full_table_closes_it() {
        let mut rig = Rig::new(2);
        rig.plug(&["a", "b"]);
        rig.pass(&["a", "b"]);

        // no closed session for c, so the walk stops before a and b are matched
        rig.plug(&["c", "a", "b"]);
        let notes = rig.pass(&["c", "a", "b"]);
        assert_eq!(
            notes,
            vec![
                Notification::CapacityExceeded {
                    capacity: 2,
                    unmanaged: ids(&["c", "a", "b"]),
                },
                Notification::Disconnected {
                    controller_id: 0,
                    identity: "a".into()
                },
                Notification::Disconnected {
                    controller_id: 1,
                    identity: "b".into()
                },
            ]
        );
        assert_eq!(rig.table.open_count(), 0);
        assert_eq!(rig.bus.open_handles(), 0);
        rig.assert_labels_match_positions();

        let notes = rig.pass(&["c", "a", "b"]);
        assert_eq!(
            notes,
            vec![
                Notification::Connected {
                    controller_id: 0,
                    identity: "c".into()
                },
                Notification::Connected {
                    controller_id: 1,
                    identity: "a".into()
                },
                Notification::CapacityExceeded {
                    capacity: 2,
                    unmanaged: ids(&["b"]),
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![Some("c".to_string()), Some("a".to_string())]
        );
    }

    #[test]
    fn capacity_counts_failed_opens() {
        let mut rig = Rig::new(2);
        rig.plug(&["a", "b", "c"]);
        rig.bus.fail_next_open("a");
        let notes = rig.pass(&["a", "b", "c"]);

        assert!(matches!(
            notes[0],
            Notification::ConnectFailed {
                controller_id: 0,
                ..
            }
        ));
        assert!(matches!(
            notes[1],
            Notification::Connected {
                controller_id: 1,
                ..
            }
        ));
        assert!(matches!(notes[2], Notification::CapacityExceeded { .. }));
        assert_eq!(rig.bound(), vec![None, Some("b".to_string())]);
    }

    #[test]
    fn failed_open_is_retried_next_pass() {
        let mut rig = Rig::new(2);
        rig.plug(&["a"]);
        rig.bus.fail_next_open("a");

        let first = rig.pass(&["a"]);
        assert!(matches!(first[0], Notification::ConnectFailed { .. }));
        assert_eq!(rig.table.open_count(), 0);

        let second = rig.pass(&["a"]);
        assert_eq!(
            second,
            vec![Notification::Connected {
                controller_id: 0,
                identity: "a".into()
            }]
        );
    }

    #[test]
    fn new_device_takes_lowest_closed_session() {
        let mut rig = Rig::new(3);
        rig.plug(&["a", "b", "c"]);
        rig.pass(&["a", "b", "c"]);

        // b drops out (poll pass would close it); a new device shows up after c
        if let Some(session) = rig.table.get_mut(1) {
            session.close();
        }
        rig.plug(&["a", "c", "d"]);
        let notes = rig.pass(&["a", "c", "d"]);

        assert_eq!(
            notes,
            vec![
                Notification::Reassigned {
                    identity: "c".into(),
                    from: 2,
                    to: 1
                },
                Notification::Connected {
                    controller_id: 2,
                    identity: "d".into()
                },
            ]
        );
        assert_eq!(
            rig.bound(),
            vec![
                Some("a".to_string()),
                Some("c".to_string()),
                Some("d".to_string())
            ]
        );
    }

    #[test]
    fn duplicate_identities_bind_once() {
        let mut rig = Rig::new(3);
        rig.plug(&["a"]);
        let notes = rig.pass(&["a", "a"]);

        assert_eq!(notes.len(), 1);
        assert_eq!(rig.table.open_count(), 1);
        assert_eq!(rig.bus.open_handles(), 1);
    }

    #[test]
    fn every_session_survives_a_pass() {
        let mut rig = Rig::new(4);
        rig.plug(&["a", "b"]);
        rig.pass(&["a", "b"]);
        rig.plug(&["c"]);
        rig.pass(&["c"]);

        assert_eq!(rig.table.capacity(), 4);
        rig.assert_labels_match_positions();
        assert_eq!(rig.bound()[0], Some("c".to_string()));
        assert_eq!(rig.table.open_count(), 1);
    }
}
