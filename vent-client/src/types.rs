use std::string::FromUtf8Error;

use prost::DecodeError;
use thiserror::Error;
use vent_types::{
    payload::Payload,
    topic::{NodeTopic, QoS},
};

/// Why an inbound publish could not be turned into an [InboundCommand].
#[derive(Error, Debug, PartialEq)]
pub enum MessageError {
    #[error("There was an error decoding the payload: {0}")]
    DecodePayloadError(DecodeError),
    #[error("The topic was invalid")]
    InvalidSparkplugTopic,
    #[error("Not a command message type: {0}")]
    NotACommand(String),
    #[error("Topic parts utf8 decode error: {0}")]
    TopicUtf8Error(FromUtf8Error),
}

impl From<FromUtf8Error> for MessageError {
    fn from(e: FromUtf8Error) -> Self {
        MessageError::TopicUtf8Error(e)
    }
}

/// The edge node or device a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    /// NCMD
    Node { group_id: String, node_id: String },
    /// DCMD
    Device {
        group_id: String,
        node_id: String,
        device_id: String,
    },
}

impl CommandTarget {
    pub fn group_id(&self) -> &str {
        match self {
            CommandTarget::Node { group_id, .. } | CommandTarget::Device { group_id, .. } => {
                group_id
            }
        }
    }

    pub fn node_id(&self) -> &str {
        match self {
            CommandTarget::Node { node_id, .. } | CommandTarget::Device { node_id, .. } => node_id,
        }
    }

    /// `None` for node commands.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            CommandTarget::Node { .. } => None,
            CommandTarget::Device { device_id, .. } => Some(device_id),
        }
    }
}

/// An NCMD or DCMD published by a host application.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCommand {
    pub target: CommandTarget,
    pub payload: Payload,
}

/// Events an [EventLoop](crate::EventLoop) implementation produces.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// The transport connected.
    Online,
    /// An established connection was lost.
    Offline,
    /// A connection attempt failed before the transport came online.
    ConnectFailed(String),
    /// A command arrived on one of the subscribed command topics.
    Command(InboundCommand),
    /// A publish that was not a well formed command.
    InvalidPublish {
        reason: MessageError,
        topic: Vec<u8>,
        payload: Vec<u8>,
    },
}

/// The death certificate the transport hands to the broker when connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub retain: bool,
    pub qos: QoS,
    pub payload: Vec<u8>,
}

impl LastWill {
    /// An NDEATH published on `topic`.
    pub fn node_death(topic: &NodeTopic, payload: Payload) -> Self {
        let (qos, retain) = topic.delivery();
        Self {
            topic: topic.topic.clone(),
            retain,
            qos,
            payload: payload.into(),
        }
    }
}
