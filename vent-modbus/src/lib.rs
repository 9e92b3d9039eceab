//! Part of the ventilation edge bridge.
//!
//! Reads the process registers of a field device over a half-duplex serial link and
//! applies actuator writes to it.
//!
//! # Feature Flags
//!
//! - `mock-transceiver`: Enables the scripted [mock::MockTransceiver]. Disabled by default.
//!

mod catalog;
mod control;
mod error;
mod polling;
mod rtu;
mod snapshot;
mod transceiver;

pub use catalog::*;
pub use control::{ControlChannel, ControlStats};
pub use error::{CatalogError, ControlError, DeviceError};
pub use polling::{PollStats, PollingEngine, DEFAULT_READ_SPACING};
pub use rtu::{RegisterKind, RtuTransceiver};
pub use snapshot::{SensorSnapshot, SensorValue};
pub use transceiver::{
    AutoDirection, Bus, DirectionControl, DynDirectionControl, DynTransceiver, SharedBus,
    Transceiver, DEFAULT_REGISTER_TIMEOUT,
};

/// A scripted [Transceiver] and [DirectionControl] for tests
#[cfg(any(test, feature = "mock-transceiver"))]
pub mod mock;
