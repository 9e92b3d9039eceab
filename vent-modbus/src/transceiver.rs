use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, trace};
use tokio::sync::Mutex;

use crate::DeviceError;

/// Timeout applied to every register transaction unless configured otherwise.
pub const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(1);

/// The request/response primitives of the field device link.
#[async_trait]
pub trait Transceiver {
    /// Read `count` consecutive registers starting at `address`.
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DeviceError>;

    /// Write a single register.
    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError>;
}

pub type DynTransceiver = dyn Transceiver + Send;

/// Driver-enable/receiver-enable control of a half-duplex line.
pub trait DirectionControl {
    /// Switch the line to transmit.
    fn drive(&mut self);
    /// Switch the line back to listening.
    fn receive(&mut self);
}

pub type DynDirectionControl = dyn DirectionControl + Send;

/// Direction control for adapters that switch direction in hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDirection;

impl DirectionControl for AutoDirection {
    fn drive(&mut self) {}
    fn receive(&mut self) {}
}

/// Holds the line in transmit for the lifetime of one transaction.
struct DriveGuard<'a> {
    direction: &'a mut DynDirectionControl,
}

impl<'a> DriveGuard<'a> {
    fn acquire(direction: &'a mut DynDirectionControl) -> Self {
        direction.drive();
        Self { direction }
    }
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        self.direction.receive();
    }
}

/// The half-duplex bus.
///
/// Wraps a [Transceiver] so that each transaction is bounded by a timeout and the line
/// is handed back to receive on every exit path, including errors, timeouts and the
/// transaction future being dropped.
pub struct Bus {
    transceiver: Box<DynTransceiver>,
    direction: Box<DynDirectionControl>,
    timeout: Duration,
}

/// A [Bus] shared between the polling engine and the control channel.
///
/// The lock serialises transactions: only one can be outstanding on the link.
pub type SharedBus = Arc<Mutex<Bus>>;

impl Bus {
    pub fn new<T>(transceiver: T) -> Self
    where
        T: Transceiver + Send + 'static,
    {
        Self {
            transceiver: Box::new(transceiver),
            direction: Box::new(AutoDirection),
            timeout: DEFAULT_REGISTER_TIMEOUT,
        }
    }

    pub fn with_direction_control<D>(mut self, direction: D) -> Self
    where
        D: DirectionControl + Send + 'static,
    {
        self.direction = Box::new(direction);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn shared(self) -> SharedBus {
        Arc::new(Mutex::new(self))
    }

    pub async fn read_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        trace!("Reading registers. address={address} count={count}");
        let _guard = DriveGuard::acquire(self.direction.as_mut());
        let values = match tokio::time::timeout(
            self.timeout,
            self.transceiver.read_registers(address, count),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(DeviceError::Timeout),
        };
        if values.len() < count as usize {
            return Err(DeviceError::ShortResponse);
        }
        Ok(values)
    }

    pub async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        trace!("Writing register. address={address} value={value}");
        let _guard = DriveGuard::acquire(self.direction.as_mut());
        match tokio::time::timeout(self.timeout, self.transceiver.write_register(address, value))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout),
        }
    }

    /// Return the line to receive.
    pub fn release(&mut self) {
        debug!("Releasing bus");
        self.direction.receive();
    }
}
