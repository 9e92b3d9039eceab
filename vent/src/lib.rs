//! Polls a DV10 ventilation unit over Modbus RTU and publishes its readings as
//! Sparkplug B device metrics.
//!
//! This crate re-exports the bridge crates and carries the pieces the `vent-edge`
//! binary is built from: the JSON [config] file and the stdin [console].

pub use vent_eon as eon;
pub use vent_modbus as modbus;
pub use vent_types as types;
pub mod client {
    pub use vent_client::*;

    pub mod mqtt_client {
        pub use vent_client_rumqtt as rumqtt;
    }
}

pub mod config;
pub mod console;
