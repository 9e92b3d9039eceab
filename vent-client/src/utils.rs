use prost::Message;
use vent_types::{
    constants::{DCMD, NCMD, SPBV01},
    payload::Payload,
};

use crate::{CommandTarget, Event, InboundCommand, MessageError};

fn topic_level(level: &[u8]) -> Result<String, MessageError> {
    if level.is_empty() {
        return Err(MessageError::InvalidSparkplugTopic);
    }
    Ok(String::from_utf8(level.to_vec())?)
}

/// Parse a publish received on a command topic.
///
/// Accepts `spBv1.0/{group}/NCMD/{node}` and `spBv1.0/{group}/DCMD/{node}/{device}`.
/// The payload is only decoded once the topic is known to be a command.
pub fn parse_command(topic: &[u8], payload: &[u8]) -> Result<InboundCommand, MessageError> {
    let levels: Vec<&[u8]> = topic.split(|c| *c == b'/').collect();
    let (namespace, group, message_type, rest) = match levels.as_slice() {
        [namespace, group, message_type, rest @ ..] => (*namespace, *group, *message_type, rest),
        _ => return Err(MessageError::InvalidSparkplugTopic),
    };
    if namespace != SPBV01.as_bytes() {
        return Err(MessageError::InvalidSparkplugTopic);
    }
    let group_id = topic_level(group)?;

    let target = if message_type == NCMD.as_bytes() {
        match rest {
            [node] => CommandTarget::Node {
                group_id,
                node_id: topic_level(node)?,
            },
            _ => return Err(MessageError::InvalidSparkplugTopic),
        }
    } else if message_type == DCMD.as_bytes() {
        match rest {
            [node, device] => CommandTarget::Device {
                group_id,
                node_id: topic_level(node)?,
                device_id: topic_level(device)?,
            },
            _ => return Err(MessageError::InvalidSparkplugTopic),
        }
    } else {
        return Err(MessageError::NotACommand(topic_level(message_type)?));
    };

    let payload = Payload::decode(payload).map_err(MessageError::DecodePayloadError)?;
    Ok(InboundCommand { target, payload })
}

/// [parse_command] as an [Event], keeping the raw publish when it is rejected.
pub fn publish_to_event(topic: &[u8], payload: &[u8]) -> Event {
    match parse_command(topic, payload) {
        Ok(command) => Event::Command(command),
        Err(reason) => Event::InvalidPublish {
            reason,
            topic: topic.to_vec(),
            payload: payload.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd_payload() -> Vec<u8> {
        Payload {
            timestamp: Some(1),
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn parses_node_command() {
        let command =
            parse_command(b"spBv1.0/Ventilation/NCMD/DV10_ESP32", &cmd_payload()).unwrap();
        assert_eq!(
            command.target,
            CommandTarget::Node {
                group_id: "Ventilation".into(),
                node_id: "DV10_ESP32".into()
            }
        );
        assert_eq!(command.payload.timestamp, Some(1));
    }

    #[test]
    fn parses_device_command() {
        let command = parse_command(
            b"spBv1.0/Ventilation/DCMD/DV10_ESP32/Sensor_Unit",
            &cmd_payload(),
        )
        .unwrap();
        assert_eq!(command.target.device_id(), Some("Sensor_Unit"));
        assert_eq!(command.target.node_id(), "DV10_ESP32");
    }

    #[test]
    fn rejects_malformed_topics() {
        let payload = cmd_payload();
        let topics: [&[u8]; 6] = [
            b"spBv1.0",
            b"other/Ventilation/NCMD/node",
            b"spBv1.0/Ventilation/NCMD/node/extra",
            b"spBv1.0/Ventilation/DCMD/node",
            b"spBv1.0//NCMD/node",
            b"spBv1.0/Ventilation/DCMD/node/",
        ];
        for topic in topics {
            assert_eq!(
                parse_command(topic, &payload),
                Err(MessageError::InvalidSparkplugTopic)
            );
        }
    }

    #[test]
    fn other_message_types_are_not_commands() {
        assert_eq!(
            parse_command(b"spBv1.0/Ventilation/DDATA/node/device", &cmd_payload()),
            Err(MessageError::NotACommand("DDATA".into()))
        );
    }

    #[test]
    fn undecodable_payload_becomes_invalid_publish() {
        let event = publish_to_event(b"spBv1.0/g/NCMD/n", &[0xff, 0xff, 0xff]);
        match event {
            Event::InvalidPublish { reason, topic, .. } => {
                assert!(matches!(reason, MessageError::DecodePayloadError(_)));
                assert_eq!(topic, b"spBv1.0/g/NCMD/n".to_vec());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
