//! Decoded controller state.
//!
//! A controller reports three things the manager cares about:
//! - a [`Pose`] (treated as opaque; no fusion happens in this crate),
//! - the state of its eight logical [`Button`]s,
//! - the analog trigger value (`0..=255`).
//!
//! ## Button states
//! Raw reports only say "pressed or not". [`ButtonStates::advance`] turns two consecutive raw
//! bitsets into the four-valued [`ButtonState`]: `Pressed` on the sample the button went down,
//! `Down` while it stays down, `Released` on the sample it came up, `Up` otherwise.

use nalgebra::{UnitQuaternion, Vector3};

/// Logical buttons, in wire bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Triangle,
    Circle,
    Cross,
    Square,
    Select,
    Start,
    PS,
    Move,
}

impl Button {
    pub const COUNT: usize = 8;

    pub const ALL: [Button; Button::COUNT] = [
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
        Button::Select,
        Button::Start,
        Button::PS,
        Button::Move,
    ];

    /// Bit index of this button in a published frame's bitmask.
    #[inline]
    pub fn bit(self) -> u32 {
        self as u32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Up,
    Pressed,
    Down,
    Released,
}

impl ButtonState {
    /// `Pressed` and `Down` both count as held.
    #[inline]
    pub fn is_held(self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::Down)
    }

    fn from_edges(was_down: bool, is_down: bool) -> Self {
        match (was_down, is_down) {
            (false, true) => ButtonState::Pressed,
            (true, true) => ButtonState::Down,
            (true, false) => ButtonState::Released,
            (false, false) => ButtonState::Up,
        }
    }
}

/// Per-button state, indexed by [`Button::bit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonStates([ButtonState; Button::COUNT]);

impl ButtonStates {
    pub fn get(&self, button: Button) -> ButtonState {
        self.0[button as usize]
    }

    pub fn set(&mut self, button: Button, state: ButtonState) {
        self.0[button as usize] = state;
    }

    /// Compute the next states from the previous and current raw "is down" bitsets.
    ///
    /// Bit `n` of each set corresponds to the button with [`Button::bit`] `n`.
    pub fn advance(previous_raw: u8, current_raw: u8) -> Self {
        let mut states = Self::default();
        for button in Button::ALL {
            let mask = 1u8 << button.bit();
            states.set(
                button,
                ButtonState::from_edges(previous_raw & mask != 0, current_raw & mask != 0),
            );
        }
        states
    }

    /// One bit per held button.
    pub fn bitmask(&self) -> u32 {
        Button::ALL
            .iter()
            .filter(|b| self.get(**b).is_held())
            .fold(0u32, |mask, b| mask | (1 << b.bit()))
    }
}

/// Orientation and position of a controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub orientation: UnitQuaternion<f32>,
    pub position: Vector3<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            orientation: UnitQuaternion::identity(),
            position: Vector3::zeros(),
        }
    }
}

/// One decoded report from a controller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControllerSample {
    pub pose: Pose,
    pub buttons: ButtonStates,
    pub trigger: u8,
}
