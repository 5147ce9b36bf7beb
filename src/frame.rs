//! Outgoing controller data frames.
//!
//! A [`DataFrame`] is built fresh from a session's last decoded state every time a poll pass
//! sees new data, stamped with the next sequence number and moved into the [`Gateway`]. The
//! manager keeps nothing after the handoff.
//!
//! ## Sequence numbers
//! [`FramePublisher`] owns the counter. It starts at `0` and is post-incremented on every
//! publish, so frames are numbered `0, 1, 2, ...` across all controllers for the life of the
//! publisher with no gaps.

use crate::session::ControllerSession;
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::mpsc;

/// Immutable snapshot of one controller's state.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrame {
    pub controller_id: usize,
    pub sequence_number: u64,
    pub connected: bool,
    pub tracking_enabled: bool,
    /// Always `false` until an optical tracker feeds positions.
    pub is_tracking: bool,
    pub orientation: UnitQuaternion<f32>,
    pub position: Vector3<f32>,
    /// Bit `n` set while the button with [`Button::bit`](crate::Button::bit) `n` is held.
    pub button_bitmask: u32,
    pub trigger_value: u8,
}

/// Downstream consumer of published frames (normally the network request layer).
///
/// Fire-and-forget: delivery problems are the gateway's concern.
pub trait Gateway {
    fn publish(&mut self, frame: DataFrame);
}

impl Gateway for Vec<DataFrame> {
    fn publish(&mut self, frame: DataFrame) {
        self.push(frame);
    }
}

/// Hand frames to another thread. Frames sent after the receiver hung up are dropped.
impl Gateway for mpsc::Sender<DataFrame> {
    fn publish(&mut self, frame: DataFrame) {
        let _ = self.send(frame);
    }
}

#[derive(Debug, Default)]
pub struct FramePublisher {
    next_sequence: u64,
}

impl FramePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Build the frame for `session`'s current state, consuming one sequence number.
    pub fn build(&mut self, session: &ControllerSession) -> DataFrame {
        let pose = session.last_pose();
        let frame = DataFrame {
            controller_id: session.slot_id(),
            sequence_number: self.next_sequence,
            connected: true,
            tracking_enabled: true,
            is_tracking: false,
            orientation: pose.orientation,
            position: pose.position,
            button_bitmask: session.last_buttons().bitmask(),
            trigger_value: session.last_trigger(),
        };
        self.next_sequence += 1;
        frame
    }

    pub fn publish<G: Gateway + ?Sized>(&mut self, session: &ControllerSession, gateway: &mut G) {
        let frame = self.build(session);
        gateway.publish(frame);
    }
}
