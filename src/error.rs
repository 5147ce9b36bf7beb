use crate::device::DeviceIdentity;
use thiserror::Error;

/// Failures reported by a bus backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("hidapi error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("device is not open")]
    NotOpen,

    #[error("device identity `{0}` is not a valid bus path")]
    InvalidIdentity(DeviceIdentity),

    #[error("device disconnected")]
    Disconnected,

    #[error("transport rejected the request: {0}")]
    Rejected(String),
}

/// Binding a session to a device failed. The session stays closed.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("slot {slot} is already open")]
    AlreadyOpen { slot: usize },

    #[error("failed to open {identity}: {source}")]
    Transport {
        identity: DeviceIdentity,
        #[source]
        source: TransportError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors surfaced by the manager's public surface.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The bus subsystem could not be brought up. Fatal: abort startup.
    #[error("transport initialization failed: {0}")]
    TransportInit(#[source] TransportError),

    #[error("controller manager has not been started")]
    NotStarted,

    #[error("no controller slot {0}")]
    UnknownController(usize),

    #[error("controller {0} is not connected")]
    ControllerClosed(usize),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
