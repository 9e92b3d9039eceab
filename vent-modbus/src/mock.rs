use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{DeviceError, DirectionControl, Transceiver};

#[derive(Default)]
struct MockState {
    registers: HashMap<u16, u16>,
    failing: HashMap<u16, DeviceError>,
    write_failure: Option<DeviceError>,
    truncate: bool,
    delay: Option<Duration>,
    reads: Vec<u16>,
    writes: Vec<(u16, u16)>,
}

/// A [Transceiver] backed by an in-memory register map.
///
/// Clones share state, so a test can keep one handle to script responses and inspect
/// traffic while the other is owned by a [Bus](crate::Bus).
#[derive(Clone, Default)]
pub struct MockTransceiver {
    state: Arc<Mutex<MockState>>,
}

impl MockTransceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&self, address: u16, value: u16) {
        self.state.lock().unwrap().registers.insert(address, value);
    }

    /// Make every read touching `address` fail with `error`.
    pub fn fail_register(&self, address: u16, error: DeviceError) {
        self.state.lock().unwrap().failing.insert(address, error);
    }

    pub fn clear_failure(&self, address: u16) {
        self.state.lock().unwrap().failing.remove(&address);
    }

    pub fn fail_writes(&self, error: Option<DeviceError>) {
        self.state.lock().unwrap().write_failure = error;
    }

    /// Return one register less than requested.
    pub fn truncate_responses(&self, truncate: bool) {
        self.state.lock().unwrap().truncate = truncate;
    }

    /// Delay every transaction, simulating a device that does not answer in time.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Start addresses of every read issued, in order.
    pub fn reads(&self) -> Vec<u16> {
        self.state.lock().unwrap().reads.clone()
    }

    /// Every write issued as `(address, value)`, in order.
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.state.lock().unwrap().writes.clone()
    }

    async fn wait(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transceiver for MockTransceiver {
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        self.wait().await;
        let mut state = self.state.lock().unwrap();
        state.reads.push(address);
        let mut values = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let register = address.wrapping_add(offset);
            if let Some(error) = state.failing.get(&register) {
                return Err(error.clone());
            }
            match state.registers.get(&register) {
                Some(value) => values.push(*value),
                None => return Err(DeviceError::IllegalDataAddress),
            }
        }
        if state.truncate {
            values.pop();
        }
        Ok(values)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        self.wait().await;
        let mut state = self.state.lock().unwrap();
        state.writes.push((address, value));
        if let Some(error) = &state.write_failure {
            return Err(error.clone());
        }
        state.registers.insert(address, value);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Drive,
    Receive,
}

/// A [DirectionControl] that records every switch.
#[derive(Clone, Default)]
pub struct RecordingDirection {
    events: Arc<Mutex<Vec<Direction>>>,
}

impl RecordingDirection {
    pub fn events(&self) -> Vec<Direction> {
        self.events.lock().unwrap().clone()
    }

    /// Whether the last switch left the line transmitting.
    pub fn is_driving(&self) -> bool {
        matches!(self.events.lock().unwrap().last(), Some(Direction::Drive))
    }
}

impl DirectionControl for RecordingDirection {
    fn drive(&mut self) {
        self.events.lock().unwrap().push(Direction::Drive);
    }

    fn receive(&mut self) {
        self.events.lock().unwrap().push(Direction::Receive);
    }
}
