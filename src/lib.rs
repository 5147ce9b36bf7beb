//! # movepool
//!
//! A fixed-capacity pool of motion controller slots.
//!
//! The host process owns a [`ControllerManager`] and calls [`ControllerManager::update`] from
//! its main loop. On each tick the manager may:
//! - **poll** every open controller and publish a [`DataFrame`] for each one that produced new
//!   data;
//! - **reconcile** the slot table against the bus enumeration so that slot `i` holds the `i`-th
//!   enumerated controller.
//!
//! Controller ids are slot positions and are **not** stable across reconciliation passes: when
//! the enumeration order changes, a connected controller can move to another slot. Every move
//! is reported as a [`Notification::Reassigned`].
//!
//! ## Modules
//! - [`device`]: the transport seam (enumerate, open, read, rumble).
//! - [`session`] and [`slots`]: one controller binding per slot.
//! - [`reconcile`]: the slot reassignment algorithm.
//! - [`frame`]: outgoing frames and the [`Gateway`] they are handed to.
//! - [`backends`]: hidapi and in-memory transports.

pub mod backends;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod frame;
pub mod manager;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod slots;
pub mod snapshot;

pub use config::ManagerConfig;
pub use controller::{Button, ButtonState, ButtonStates, ControllerSample, Pose};
pub use device::{DeviceEnumerator, DeviceHandle, DeviceIdentity, DeviceRead, Transport};
pub use error::{ConfigError, ManagerError, OpenError, TransportError};
pub use event::{Notification, NotificationKind};
pub use eventbus::{NotificationBus, NotificationFilter, NotificationListener};
pub use frame::{DataFrame, FramePublisher, Gateway};
pub use manager::{ControllerManager, MAX_CONTROLLERS};
pub use snapshot::{SlotView, TableSnapshot};
