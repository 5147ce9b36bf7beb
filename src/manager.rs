//! The controller manager.
//!
//! [`ControllerManager`] owns the slot table, the scheduler and the frame sequence counter, and
//! exposes the three calls a host process needs:
//!
//! - [`startup`](ControllerManager::startup): load config, bring the transport up;
//! - [`update`](ControllerManager::update): call every millisecond or so from the main loop;
//! - [`shutdown`](ControllerManager::shutdown): close every controller, save config, release the
//!   transport.
//!
//! Everything runs synchronously on the caller's thread. Nothing in here blocks unless the
//! transport does.
//!
//! # Example
//! ```no_run
//! use movepool::backends::hid::HidTransport;
//! use movepool::{ControllerManager, DataFrame};
//! use std::time::{Duration, Instant};
//!
//! let (tx, rx) = std::sync::mpsc::channel::<DataFrame>();
//! let mut mgr = ControllerManager::new(HidTransport::new(), tx)
//!     .with_config_path("manager.toml");
//! mgr.startup().expect("transport");
//! loop {
//!     mgr.update(Instant::now());
//!     for frame in rx.try_iter() {
//!         println!("{frame:?}");
//!     }
//!     std::thread::sleep(Duration::from_millis(1));
//! }
//! ```

use crate::config::ManagerConfig;
use crate::device::Transport;
use crate::error::ManagerError;
use crate::event::Notification;
use crate::eventbus::NotificationBus;
use crate::frame::{FramePublisher, Gateway};
use crate::reconcile::reconcile;
use crate::scheduler::PollScheduler;
use crate::session::ReadOutcome;
use crate::slots::SlotTable;
use crate::snapshot::TableSnapshot;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Default number of controller slots.
pub const MAX_CONTROLLERS: usize = 5;

pub struct ControllerManager<T: Transport, G: Gateway> {
    transport: T,
    gateway: G,
    table: SlotTable,
    publisher: FramePublisher,
    scheduler: PollScheduler,
    config: ManagerConfig,
    config_path: Option<PathBuf>,
    bus: NotificationBus,
    started: bool,
}

impl<T: Transport, G: Gateway> ControllerManager<T, G> {
    pub fn new(transport: T, gateway: G) -> Self {
        Self::with_capacity(transport, gateway, MAX_CONTROLLERS)
    }

    pub fn with_capacity(transport: T, gateway: G, capacity: usize) -> Self {
        let config = ManagerConfig::default();
        Self {
            transport,
            gateway,
            table: SlotTable::new(capacity),
            publisher: FramePublisher::new(),
            scheduler: PollScheduler::new(config.poll_interval(), config.reconnect_interval()),
            config,
            config_path: None,
            bus: NotificationBus::new(),
            started: false,
        }
    }

    /// Load config from `path` at startup and write it back at shutdown.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use `config` as-is. Overridden by [`with_config_path`](Self::with_config_path).
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the config and initialize the transport.
    ///
    /// A transport failure is fatal: the manager stays stopped and `update` does nothing.
    pub fn startup(&mut self) -> Result<(), ManagerError> {
        if self.started {
            return Ok(());
        }

        if let Some(path) = &self.config_path {
            self.config = ManagerConfig::load_or_default(path);
        }
        debug!(config = ?self.config, "controller manager config");

        if let Err(err) = self.transport.init() {
            error!(error = %err, "failed to initialize controller transport");
            return Err(ManagerError::TransportInit(err));
        }

        self.scheduler =
            PollScheduler::new(self.config.poll_interval(), self.config.reconnect_interval());
        self.started = true;
        info!(capacity = self.table.capacity(), "controller manager started");
        Ok(())
    }

    /// One tick. Runs a poll pass and/or a reconnect pass when their intervals have elapsed.
    pub fn update(&mut self, now: Instant) {
        if !self.started {
            trace!("update ignored, manager not started");
            return;
        }

        let due = self.scheduler.tick(now);
        if due.poll {
            self.poll_open_controllers();
        }
        if due.reconnect {
            self.update_connected_controllers();
        }
    }

    /// Close every open controller, persist the config and release the transport.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }

        for session in self.table.iter_mut() {
            if let Some(identity) = session.close() {
                info!(
                    controller_id = session.slot_id(),
                    %identity,
                    "controller closed on shutdown"
                );
            }
        }

        if let Some(path) = &self.config_path {
            if let Err(err) = self.config.save(path) {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to save controller manager config"
                );
            }
        }

        self.transport.shutdown();
        self.started = false;
        info!("controller manager stopped");
    }

    pub fn set_controller_rumble(
        &mut self,
        controller_id: usize,
        amount: u8,
    ) -> Result<(), ManagerError> {
        if !self.started {
            return Err(ManagerError::NotStarted);
        }
        let session = self
            .table
            .get_mut(controller_id)
            .ok_or(ManagerError::UnknownController(controller_id))?;
        if !session.is_open() {
            return Err(ManagerError::ControllerClosed(controller_id));
        }
        session.set_rumble(amount)?;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Sequence number the next published frame will carry.
    pub fn next_sequence_number(&self) -> u64 {
        self.publisher.next_sequence()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.table.snapshot()
    }

    pub fn notification_bus(&mut self) -> &mut NotificationBus {
        &mut self.bus
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn poll_open_controllers(&mut self) {
        let mut closed = Vec::new();

        for session in self.table.iter_mut() {
            if !session.is_open() {
                continue;
            }

            match session.read() {
                ReadOutcome::NoNewData => {
                    // TODO: close controllers that stay silent past an idle timeout
                }
                ReadOutcome::NewData => {
                    self.publisher.publish(session, &mut self.gateway);
                }
                ReadOutcome::Failure(err) => {
                    if let Some(identity) = session.close() {
                        closed.push(Notification::ReadFailureClosed {
                            controller_id: session.slot_id(),
                            identity,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        for notification in closed {
            self.emit(notification);
        }
    }

    fn update_connected_controllers(&mut self) {
        let snapshot = self.transport.snapshot();
        trace!(devices = snapshot.len(), "reconciling controller slots");

        let notifications = reconcile(&mut self.table, &snapshot, &mut self.transport);
        for notification in notifications {
            self.emit(notification);
        }
    }

    fn emit(&mut self, notification: Notification) {
        match &notification {
            Notification::Reassigned { .. }
            | Notification::Connected { .. }
            | Notification::ReadFailureClosed { .. } => info!("{notification}"),
            Notification::Disconnected { .. } | Notification::ConnectFailed { .. } => {
                warn!("{notification}")
            }
            Notification::CapacityExceeded { .. } => error!("{notification}"),
        }
        self.bus.emit(&notification);
    }
}
