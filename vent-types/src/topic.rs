//! The Sparkplug topic namespace, `spBv1.0/{group}/{type}/{node}[/{device}]`, restricted
//! to the message types a single device edge node publishes or subscribes to.

use std::fmt;

use super::constants::{DBIRTH, DCMD, DDATA, NBIRTH, NCMD, NDEATH, SPBV01};

#[derive(Clone, Debug, PartialEq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Node level message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeMessage {
    NBirth,
    NDeath,
    NCmd,
}

impl NodeMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeMessage::NBirth => NBIRTH,
            NodeMessage::NDeath => NDEATH,
            NodeMessage::NCmd => NCMD,
        }
    }

    /// QoS and retain flag the message type is published with.
    pub fn delivery(&self) -> (QoS, bool) {
        match self {
            NodeMessage::NDeath => (QoS::AtLeastOnce, false),
            NodeMessage::NBirth | NodeMessage::NCmd => (QoS::AtMostOnce, false),
        }
    }
}

/// Device level message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceMessage {
    DBirth,
    DData,
    DCmd,
}

impl DeviceMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceMessage::DBirth => DBIRTH,
            DeviceMessage::DData => DDATA,
            DeviceMessage::DCmd => DCMD,
        }
    }

    pub fn delivery(&self) -> (QoS, bool) {
        match self {
            DeviceMessage::DBirth => (QoS::AtLeastOnce, false),
            DeviceMessage::DData | DeviceMessage::DCmd => (QoS::AtMostOnce, false),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeTopic {
    pub topic: String,
    pub message_type: NodeMessage,
}

impl NodeTopic {
    pub fn new(group_id: &str, message_type: NodeMessage, node_id: &str) -> Self {
        Self {
            topic: format!("{SPBV01}/{group_id}/{}/{node_id}", message_type.as_str()),
            message_type,
        }
    }

    pub fn delivery(&self) -> (QoS, bool) {
        self.message_type.delivery()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceTopic {
    pub topic: String,
    pub message_type: DeviceMessage,
}

impl DeviceTopic {
    pub fn new(group_id: &str, message_type: DeviceMessage, node_id: &str, device_id: &str) -> Self {
        Self {
            topic: format!(
                "{SPBV01}/{group_id}/{}/{node_id}/{device_id}",
                message_type.as_str()
            ),
            message_type,
        }
    }

    pub fn delivery(&self) -> (QoS, bool) {
        self.message_type.delivery()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Topic {
    NodeTopic(NodeTopic),
    DeviceTopic(DeviceTopic),
}

impl Topic {
    pub fn as_str(&self) -> &str {
        match self {
            Topic::NodeTopic(t) => &t.topic,
            Topic::DeviceTopic(t) => &t.topic,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        match value {
            Topic::NodeTopic(node_topic) => node_topic.topic,
            Topic::DeviceTopic(device_topic) => device_topic.topic,
        }
    }
}

/// A subscription request.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicFilter {
    pub topic: Topic,
    pub qos: QoS,
}

impl TopicFilter {
    pub fn new(topic: Topic, qos: QoS) -> Self {
        Self { topic, qos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_topics_are_namespaced() {
        let nbirth = NodeTopic::new("Ventilation", NodeMessage::NBirth, "DV10_ESP32");
        assert_eq!(nbirth.topic, "spBv1.0/Ventilation/NBIRTH/DV10_ESP32");

        let ddata = DeviceTopic::new(
            "Ventilation",
            DeviceMessage::DData,
            "DV10_ESP32",
            "Sensor_Unit",
        );
        assert_eq!(
            ddata.topic,
            "spBv1.0/Ventilation/DDATA/DV10_ESP32/Sensor_Unit"
        );
        let topic = Topic::DeviceTopic(ddata.clone());
        assert_eq!(topic.to_string(), ddata.topic);
        assert_eq!(String::from(topic), ddata.topic);
    }

    #[test]
    fn certificates_are_delivered_at_least_once() {
        let ndeath = NodeTopic::new("g", NodeMessage::NDeath, "n");
        assert_eq!(ndeath.delivery(), (QoS::AtLeastOnce, false));
        let dbirth = DeviceTopic::new("g", DeviceMessage::DBirth, "n", "d");
        assert_eq!(dbirth.delivery(), (QoS::AtLeastOnce, false));
        let ddata = DeviceTopic::new("g", DeviceMessage::DData, "n", "d");
        assert_eq!(ddata.delivery(), (QoS::AtMostOnce, false));
    }
}
