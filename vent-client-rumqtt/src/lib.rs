//! A [vent_client::Client] and [vent_client::EventLoop] implementation backed by [rumqttc] (MQTT v5).

mod client;

pub use client::{Client, EventLoop, DEFAULT_REQUEST_CAPACITY, MIN_REQUEST_CAPACITY};
pub use rumqttc::v5::MqttOptions;
