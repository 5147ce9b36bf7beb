//! Device identity and the transport seams.
//!
//! The manager never talks to a bus directly. It consumes:
//! - a [`DeviceEnumerator`] that reports which devices are attached right now, in bus order;
//! - a [`Transport`] that opens a [`DeviceHandle`] for one of those identities.
//!
//! Closing a device is dropping its handle. Backends release OS resources in `Drop`.

use crate::controller::ControllerSample;
use crate::error::TransportError;
use std::fmt;

/// Opaque token identifying one physical device instance (typically the bus path).
///
/// Stable across enumeration passes while the device stays attached. A device that is
/// unplugged and plugged back in may come back with a different identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Result of one non-blocking read on an open device.
#[derive(Debug)]
pub enum DeviceRead {
    /// Nothing new since the last read.
    Idle,
    /// A freshly decoded sample.
    Sample(ControllerSample),
    /// The device stopped answering; the owner is expected to close it.
    Failed(TransportError),
}

/// An open connection to one controller.
pub trait DeviceHandle {
    /// Non-blocking read of the most recent report.
    fn read(&mut self) -> DeviceRead;

    /// Drive the rumble motor (`0` = off, `255` = full).
    fn set_rumble(&mut self, amount: u8) -> Result<(), TransportError>;
}

/// Produces an ordered list of the devices currently attached.
pub trait DeviceEnumerator {
    /// Order reflects bus enumeration order, not any previous slot assignment.
    fn snapshot(&mut self) -> Vec<DeviceIdentity>;
}

/// Bus subsystem able to enumerate and open controllers.
pub trait Transport: DeviceEnumerator {
    /// Bring the bus subsystem up. Failure here leaves the manager unusable.
    fn init(&mut self) -> Result<(), TransportError>;

    fn open(&mut self, identity: &DeviceIdentity) -> Result<Box<dyn DeviceHandle>, TransportError>;

    /// Tear the bus subsystem down. Handles must already be dropped.
    fn shutdown(&mut self);
}
