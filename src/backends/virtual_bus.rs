//! In-memory, scriptable bus.
//!
//! [`VirtualBus`] is a cloneable handle to shared bus state; [`VirtualTransport`] plugs that
//! state into the manager as a regular [`Transport`]. Test code keeps a clone of the bus and
//! drives it while the manager runs:
//!
//! ```
//! use movepool::backends::virtual_bus::{VirtualBus, VirtualTransport};
//! use movepool::{ControllerManager, ControllerSample, DataFrame};
//! use std::time::{Duration, Instant};
//!
//! let bus = VirtualBus::new();
//! let transport = VirtualTransport::new(bus.clone());
//! let mut mgr = ControllerManager::new(transport, Vec::<DataFrame>::new());
//! mgr.startup().unwrap();
//!
//! bus.attach("virtual:0");
//! let t0 = Instant::now();
//! mgr.update(t0); // first tick reconciles: virtual:0 lands in slot 0
//!
//! bus.push_sample("virtual:0", ControllerSample::default());
//! mgr.update(t0 + Duration::from_millis(2));
//! assert_eq!(mgr.gateway().len(), 1);
//! ```
//!
//! Each `attach` starts a new attachment generation. A handle opened against an older
//! generation reads as disconnected, the same way a real handle goes stale after a replug.

use crate::controller::ControllerSample;
use crate::device::{DeviceEnumerator, DeviceHandle, DeviceIdentity, DeviceRead, Transport};
use crate::error::TransportError;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct BusState {
    attached: Vec<(DeviceIdentity, u64)>,
    next_generation: u64,
    samples: HashMap<DeviceIdentity, VecDeque<ControllerSample>>,
    failing_opens: HashSet<DeviceIdentity>,
    failing_reads: HashSet<DeviceIdentity>,
    rumble: HashMap<DeviceIdentity, u8>,
    open_handles: usize,
    fail_init: bool,
    initialized: bool,
}

impl BusState {
    fn generation_of(&self, identity: &DeviceIdentity) -> Option<u64> {
        self.attached
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, generation)| *generation)
    }
}

/// Shared handle to the virtual bus state.
#[derive(Clone, Default)]
pub struct VirtualBus {
    state: Arc<Mutex<BusState>>,
}

impl VirtualBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug a device in at the end of the enumeration order. Re-attaching an attached
    /// identity is a no-op.
    pub fn attach(&self, identity: impl Into<DeviceIdentity>) {
        let identity = identity.into();
        let mut state = self.state.lock();
        if state.generation_of(&identity).is_some() {
            return;
        }
        let generation = state.next_generation;
        state.next_generation += 1;
        state.attached.push((identity, generation));
    }

    /// Unplug a device. Queued samples are discarded.
    pub fn detach(&self, identity: impl Into<DeviceIdentity>) {
        let identity = identity.into();
        let mut state = self.state.lock();
        state.attached.retain(|(id, _)| *id != identity);
        state.samples.remove(&identity);
    }

    /// Reorder the attached devices. Identities already attached keep their generation
    /// (open handles stay valid); new ones are attached; missing ones are detached.
    pub fn set_order<I, D>(&self, order: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceIdentity>,
    {
        let mut state = self.state.lock();
        let mut next = Vec::new();
        for identity in order.into_iter().map(Into::into) {
            let generation = match state.generation_of(&identity) {
                Some(generation) => generation,
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    generation
                }
            };
            next.push((identity, generation));
        }
        let previous = std::mem::replace(&mut state.attached, next);
        for (identity, _) in previous {
            if state.generation_of(&identity).is_none() {
                state.samples.remove(&identity);
            }
        }
    }

    /// Queue a sample to be returned by the next read on `identity`.
    pub fn push_sample(&self, identity: impl Into<DeviceIdentity>, sample: ControllerSample) {
        self.state
            .lock()
            .samples
            .entry(identity.into())
            .or_default()
            .push_back(sample);
    }

    /// Make the next `open` of `identity` fail.
    pub fn fail_next_open(&self, identity: impl Into<DeviceIdentity>) {
        self.state.lock().failing_opens.insert(identity.into());
    }

    /// Make the next read of `identity` fail while it stays attached.
    pub fn fail_next_read(&self, identity: impl Into<DeviceIdentity>) {
        self.state.lock().failing_reads.insert(identity.into());
    }

    /// Make [`Transport::init`] fail.
    pub fn fail_init(&self) {
        self.state.lock().fail_init = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Number of handles currently held open by the transport's users.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }

    /// Last rumble amount written to `identity`.
    pub fn rumble(&self, identity: impl Into<DeviceIdentity>) -> Option<u8> {
        self.state.lock().rumble.get(&identity.into()).copied()
    }
}

/// [`Transport`] backed by a [`VirtualBus`].
pub struct VirtualTransport {
    bus: VirtualBus,
}

impl VirtualTransport {
    pub fn new(bus: VirtualBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &VirtualBus {
        &self.bus
    }
}

impl DeviceEnumerator for VirtualTransport {
    fn snapshot(&mut self) -> Vec<DeviceIdentity> {
        self.bus
            .state
            .lock()
            .attached
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Transport for VirtualTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        let mut state = self.bus.state.lock();
        if state.fail_init {
            return Err(TransportError::Rejected("virtual bus init disabled".into()));
        }
        state.initialized = true;
        Ok(())
    }

    fn open(&mut self, identity: &DeviceIdentity) -> Result<Box<dyn DeviceHandle>, TransportError> {
        let mut state = self.bus.state.lock();
        let generation = state
            .generation_of(identity)
            .ok_or(TransportError::Disconnected)?;
        if state.failing_opens.remove(identity) {
            return Err(TransportError::Rejected(format!("open of {identity} refused")));
        }
        state.open_handles += 1;

        Ok(Box::new(VirtualHandle {
            identity: identity.clone(),
            generation,
            bus: self.bus.clone(),
        }))
    }

    fn shutdown(&mut self) {
        self.bus.state.lock().initialized = false;
    }
}

struct VirtualHandle {
    identity: DeviceIdentity,
    generation: u64,
    bus: VirtualBus,
}

impl DeviceHandle for VirtualHandle {
    fn read(&mut self) -> DeviceRead {
        let mut state = self.bus.state.lock();
        if state.generation_of(&self.identity) != Some(self.generation) {
            return DeviceRead::Failed(TransportError::Disconnected);
        }
        if state.failing_reads.remove(&self.identity) {
            return DeviceRead::Failed(TransportError::Rejected("injected read failure".into()));
        }
        match state
            .samples
            .get_mut(&self.identity)
            .and_then(|queue| queue.pop_front())
        {
            Some(sample) => DeviceRead::Sample(sample),
            None => DeviceRead::Idle,
        }
    }

    fn set_rumble(&mut self, amount: u8) -> Result<(), TransportError> {
        let mut state = self.bus.state.lock();
        if state.generation_of(&self.identity) != Some(self.generation) {
            return Err(TransportError::Disconnected);
        }
        state.rumble.insert(self.identity.clone(), amount);
        Ok(())
    }
}

impl Drop for VirtualHandle {
    fn drop(&mut self) {
        let mut state = self.bus.state.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}
