use std::time::Duration;

use tokio::{task::JoinHandle, time::timeout};
use vent_client::{
    channel::{ChannelBroker, ChannelEventLoop, OutboundMessage},
    CommandTarget, Event, InboundCommand,
};
use vent_eon::{BridgeBuilder, BridgeHandle, BridgeStatus};
use vent_modbus::{mock::MockTransceiver, Bus, RegisterCatalog};
use vent_types::{
    constants::{BDSEQ, ENG_UNIT, NODE_CONTROL_REBIRTH},
    payload::{metric, DataType, Metric, Payload},
    topic::{
        DeviceMessage as DeviceMessageType, DeviceTopic, NodeMessage as NodeMessageType,
        NodeTopic, QoS, Topic, TopicFilter,
    },
    MetricValue,
};

pub const GROUP_ID: &str = "Ventilation";
pub const NODE_ID: &str = "DV10_ESP32";
pub const DEVICE_ID: &str = "Sensor_Unit";

/// Raw value every register of the loaded mock returns.
pub const RAW_VALUE: u16 = 250;

pub struct TestBridge {
    pub broker: ChannelBroker,
    pub handle: BridgeHandle,
    pub mock: MockTransceiver,
    pub task: JoinHandle<()>,
}

pub fn loaded_mock(catalog: &RegisterCatalog) -> MockTransceiver {
    let mock = MockTransceiver::new();
    for register in catalog.iter() {
        mock.set_register(register.address, RAW_VALUE);
    }
    mock
}

/// Spawn a bridge over the channel transport and a loaded mock device.
///
/// Auto read is off and reads are not spaced unless `configure` says otherwise.
pub fn start_bridge<F>(configure: F) -> TestBridge
where
    F: FnOnce(BridgeBuilder) -> BridgeBuilder,
{
    let (eventloop, client, broker) = ChannelEventLoop::new();
    let mock = loaded_mock(&RegisterCatalog::dv10());
    let builder = BridgeBuilder::new(eventloop, client, Bus::new(mock.clone()))
        .with_group_id(GROUP_ID)
        .with_node_id(NODE_ID)
        .with_device_id(DEVICE_ID)
        .with_read_spacing(Duration::ZERO)
        .with_auto_read(false);
    let (bridge, handle) = configure(builder).build().unwrap();
    let task = tokio::spawn(bridge.run());
    TestBridge {
        broker,
        handle,
        mock,
        task,
    }
}

pub async fn recv_within(broker: &mut ChannelBroker, duration: Duration) -> OutboundMessage {
    timeout(duration, broker.rx_outbound.recv())
        .await
        .unwrap()
        .unwrap()
}

pub async fn recv(broker: &mut ChannelBroker) -> OutboundMessage {
    recv_within(broker, Duration::from_secs(1)).await
}

pub fn assert_quiet(broker: &mut ChannelBroker) {
    if let Ok(message) = broker.rx_outbound.try_recv() {
        panic!("unexpected outbound message {message:?}");
    }
}

pub async fn wait_status<F>(handle: &BridgeHandle, predicate: F) -> BridgeStatus
where
    F: FnMut(&BridgeStatus) -> bool,
{
    timeout(Duration::from_secs(60), handle.wait_for_status(predicate))
        .await
        .unwrap()
        .unwrap()
}

pub fn death_payload(bdseq: i64) -> Payload {
    let mut metric = Metric::new();
    metric
        .set_name(BDSEQ.to_string())
        .set_datatype(DataType::Int64)
        .set_value(MetricValue::from(bdseq).into());
    Payload {
        metrics: vec![metric],
        ..Default::default()
    }
}

fn find_metric<'a>(payload: &'a Payload, name: &str) -> &'a Metric {
    payload
        .metrics
        .iter()
        .find(|m| m.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("{name} missing from {payload:?}"))
}

/// NBIRTH is always seq 0 and carries the rebirth control and the session bdSeq.
pub fn verify_nbirth_payload(payload: Payload, expected_bdseq: i64) {
    assert_eq!(payload.seq, Some(0));
    assert!(payload.timestamp.is_some());
    assert_eq!(payload.metrics.len(), 2);

    let rebirth = find_metric(&payload, NODE_CONTROL_REBIRTH);
    assert_eq!(rebirth.datatype, Some(DataType::Boolean as u32));
    assert_eq!(rebirth.value, Some(metric::Value::BooleanValue(false)));

    let bdseq = find_metric(&payload, BDSEQ);
    assert_eq!(bdseq.datatype, Some(DataType::Int64 as u32));
    assert_eq!(bdseq.value, Some(MetricValue::Int64(expected_bdseq).into()));
}

pub fn verify_dbirth_payload(payload: Payload, expected_seq: u64) {
    let catalog = RegisterCatalog::dv10();
    assert_eq!(payload.seq, Some(expected_seq));
    assert_ne!(payload.timestamp, None);
    assert_eq!(payload.metrics.len(), catalog.len());
    for (metric, register) in payload.metrics.iter().zip(catalog.iter()) {
        assert_eq!(metric.name.as_ref(), Some(&register.name));
        assert_eq!(metric.datatype, Some(register.datatype() as u32));
        assert_eq!(metric.is_null, None);
        assert_eq!(
            metric.string_property(ENG_UNIT),
            Some(register.unit.symbol())
        );
    }
}

pub async fn expect_subscriptions(broker: &mut ChannelBroker, within: Duration) {
    let filters = match recv_within(broker, within).await {
        OutboundMessage::Subscribe(filters) => filters,
        message => panic!("got {message:?}"),
    };
    let ncmd = NodeTopic::new(GROUP_ID, NodeMessageType::NCmd, NODE_ID);
    let dcmd = DeviceTopic::new(GROUP_ID, DeviceMessageType::DCmd, NODE_ID, DEVICE_ID);
    assert_eq!(
        filters,
        vec![
            TopicFilter::new(Topic::NodeTopic(ncmd), QoS::AtLeastOnce),
            TopicFilter::new(Topic::DeviceTopic(dcmd), QoS::AtLeastOnce),
        ]
    );
}

pub async fn expect_node_birth(broker: &mut ChannelBroker, expected_bdseq: i64) {
    let (topic, payload) = match recv(broker).await {
        OutboundMessage::NodeMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(
        topic,
        NodeTopic::new(GROUP_ID, NodeMessageType::NBirth, NODE_ID)
    );
    verify_nbirth_payload(payload, expected_bdseq);
}

pub async fn expect_device_birth(broker: &mut ChannelBroker) {
    let (topic, payload) = match recv(broker).await {
        OutboundMessage::DeviceMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(
        topic,
        DeviceTopic::new(GROUP_ID, DeviceMessageType::DBirth, NODE_ID, DEVICE_ID)
    );
    verify_dbirth_payload(payload, 1);
}

pub async fn expect_data_within(broker: &mut ChannelBroker, within: Duration) -> Payload {
    let (topic, payload) = match recv_within(broker, within).await {
        OutboundMessage::DeviceMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    };
    assert_eq!(
        topic,
        DeviceTopic::new(GROUP_ID, DeviceMessageType::DData, NODE_ID, DEVICE_ID)
    );
    payload
}

pub async fn expect_data(broker: &mut ChannelBroker) -> Payload {
    expect_data_within(broker, Duration::from_secs(1)).await
}

/// Births that follow a connect: subscriptions, NBIRTH, DBIRTH.
pub async fn expect_session_birth(broker: &mut ChannelBroker, expected_bdseq: i64, within: Duration) {
    expect_subscriptions(broker, within).await;
    expect_node_birth(broker, expected_bdseq).await;
    expect_device_birth(broker).await;
}

pub async fn bring_online(broker: &mut ChannelBroker, expected_bdseq: i64) {
    broker.tx_event.send(Event::Online).unwrap();
    expect_session_birth(broker, expected_bdseq, Duration::from_secs(1)).await;
}

fn cmd_payload(metric: Metric) -> Payload {
    Payload {
        timestamp: Some(0),
        metrics: vec![metric],
        seq: None,
        uuid: None,
        body: None,
    }
}

pub fn rebirth_command(rebirth: bool) -> Event {
    let mut metric = Metric::new();
    metric
        .set_name(NODE_CONTROL_REBIRTH.into())
        .set_datatype(DataType::Boolean)
        .set_value(metric::Value::BooleanValue(rebirth));
    Event::Command(InboundCommand {
        target: CommandTarget::Node {
            group_id: GROUP_ID.to_string(),
            node_id: NODE_ID.to_string(),
        },
        payload: cmd_payload(metric),
    })
}

pub fn fan_mode_command(value: MetricValue) -> Event {
    fan_mode_wire_command(value.datatype(), value.into())
}

/// A FanMode DCMD with an arbitrary declared datatype and wire value.
pub fn fan_mode_wire_command(datatype: DataType, value: metric::Value) -> Event {
    let mut metric = Metric::new();
    metric
        .set_name("FanMode".into())
        .set_datatype(datatype)
        .set_value(value);
    Event::Command(InboundCommand {
        target: CommandTarget::Device {
            group_id: GROUP_ID.to_string(),
            node_id: NODE_ID.to_string(),
            device_id: DEVICE_ID.to_string(),
        },
        payload: cmd_payload(metric),
    })
}
