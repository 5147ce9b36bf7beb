//! One reusable controller session.
//!
//! A [`ControllerSession`] is a pooled object: it is created once per slot and then rebound to
//! different physical devices over its lifetime. It is either:
//! - **Closed**: no device handle, no identity;
//! - **Open**: bound to exactly one [`DeviceIdentity`] through a live [`DeviceHandle`].
//!
//! The identity and the handle live together in a single binding, so "identity present iff open"
//! holds by construction.

use crate::controller::{ButtonStates, ControllerSample, Pose};
use crate::device::{DeviceHandle, DeviceIdentity, DeviceRead, Transport};
use crate::error::{OpenError, TransportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
}

/// Outcome of [`ControllerSession::read`].
#[derive(Debug)]
pub enum ReadOutcome {
    NoNewData,
    NewData,
    /// The caller must close the session; it does not close itself.
    Failure(TransportError),
}

struct Binding {
    identity: DeviceIdentity,
    handle: Box<dyn DeviceHandle>,
}

pub struct ControllerSession {
    slot_id: usize,
    binding: Option<Binding>,
    last: ControllerSample,
}

impl ControllerSession {
    pub fn new(slot_id: usize) -> Self {
        Self {
            slot_id,
            binding: None,
            last: ControllerSample::default(),
        }
    }

    /// Externally visible controller id.
    #[inline]
    pub fn slot_id(&self) -> usize {
        self.slot_id
    }

    pub(crate) fn set_slot_id(&mut self, slot_id: usize) {
        self.slot_id = slot_id;
    }

    pub fn state(&self) -> SessionState {
        if self.binding.is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.binding.is_some()
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.binding.as_ref().map(|b| &b.identity)
    }

    /// True when open and bound to `identity`.
    pub fn matches(&self, identity: &DeviceIdentity) -> bool {
        self.identity() == Some(identity)
    }

    pub fn last_pose(&self) -> &Pose {
        &self.last.pose
    }

    pub fn last_buttons(&self) -> &ButtonStates {
        &self.last.buttons
    }

    pub fn last_trigger(&self) -> u8 {
        self.last.trigger
    }

    /// Bind this session to `identity`. On error the session stays closed.
    pub fn open<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        identity: &DeviceIdentity,
    ) -> Result<(), OpenError> {
        if self.is_open() {
            return Err(OpenError::AlreadyOpen { slot: self.slot_id });
        }

        let handle = transport
            .open(identity)
            .map_err(|source| OpenError::Transport {
                identity: identity.clone(),
                source,
            })?;

        self.last = ControllerSample::default();
        self.binding = Some(Binding {
            identity: identity.clone(),
            handle,
        });
        Ok(())
    }

    /// Release the device handle. No-op when already closed.
    ///
    /// Returns the identity the session was bound to, if any.
    pub fn close(&mut self) -> Option<DeviceIdentity> {
        self.binding.take().map(|binding| binding.identity)
    }

    pub fn read(&mut self) -> ReadOutcome {
        let Some(binding) = self.binding.as_mut() else {
            return ReadOutcome::Failure(TransportError::NotOpen);
        };

        match binding.handle.read() {
            DeviceRead::Idle => ReadOutcome::NoNewData,
            DeviceRead::Sample(sample) => {
                self.last = sample;
                ReadOutcome::NewData
            }
            DeviceRead::Failed(err) => ReadOutcome::Failure(err),
        }
    }

    pub fn set_rumble(&mut self, amount: u8) -> Result<(), TransportError> {
        match self.binding.as_mut() {
            Some(binding) => binding.handle.set_rumble(amount),
            None => Err(TransportError::NotOpen),
        }
    }
}

impl std::fmt::Debug for ControllerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSession")
            .field("slot_id", &self.slot_id)
            .field("identity", &self.identity())
            .field("last", &self.last)
            .finish()
    }
}
