use async_trait::async_trait;
use vent_types::{
    payload::Payload,
    topic::{DeviceTopic, NodeTopic, TopicFilter},
};

use crate::{Event, LastWill};

/// The publishing half of a transport.
///
/// Every method reports only whether the request was handed to the transport. `Err(())`
/// carries no detail; implementations log the cause themselves.
#[async_trait]
pub trait Client {
    async fn disconnect(&self) -> Result<(), ()>;

    /// Publish on a node topic with the delivery settings of its message type.
    ///
    /// Waits until the transport accepts the message.
    async fn publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()>;

    /// Like [Client::publish_node_message] but fails instead of waiting when the
    /// transport queue is full. Used for the death certificate on shutdown.
    async fn try_publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()>;

    /// Publish on a device topic with the delivery settings of its message type.
    async fn publish_device_message(&self, topic: DeviceTopic, payload: Payload) -> Result<(), ()>;

    /// Request all `topics` in one subscribe.
    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ()>;
}

pub type DynClient = dyn Client + Send + Sync;

/// Drives the transport connection and yields connectivity changes and inbound commands.
///
/// Connection attempts only happen while `poll` is being awaited. When `poll` is not
/// called no reconnect happens, so the caller decides the backoff between attempts.
#[async_trait]
pub trait EventLoop {
    async fn poll(&mut self) -> Event;

    /// Replace the will registered with the broker on the next connect.
    fn set_last_will(&mut self, will: LastWill);
}

pub type DynEventLoop = dyn EventLoop + Send;
