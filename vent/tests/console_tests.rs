use std::time::Duration;

use tokio::{sync::mpsc, time::timeout};
use vent::{
    client::channel::ChannelEventLoop,
    console,
    eon::{Bridge, BridgeBuilder, BridgeHandle, BridgeStatus},
    modbus::{mock::MockTransceiver, Bus, RegisterCatalog, FAN_MODE_REGISTER},
};

fn build_bridge(mock: &MockTransceiver) -> (Bridge, BridgeHandle) {
    let (eventloop, client, _broker) = ChannelEventLoop::new();
    BridgeBuilder::new(eventloop, client, Bus::new(mock.clone()))
        .with_group_id("Ventilation")
        .with_node_id("DV10_ESP32")
        .with_device_id("Sensor_Unit")
        .with_read_spacing(Duration::ZERO)
        .with_auto_read(false)
        .build()
        .unwrap()
}

async fn wait_status<F>(handle: &BridgeHandle, predicate: F) -> BridgeStatus
where
    F: FnMut(&BridgeStatus) -> bool,
{
    timeout(Duration::from_secs(5), handle.wait_for_status(predicate))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn console_forwards_commands() {
    let mock = MockTransceiver::new();
    for register in RegisterCatalog::dv10().iter() {
        mock.set_register(register.address, 1);
    }
    let (bridge, handle) = build_bridge(&mock);
    tokio::spawn(bridge.run());

    let (tx, rx) = mpsc::unbounded_channel();
    for line in ["m", "", "x", "i 2", "4", "2", "r", "s"] {
        tx.send(line.to_string()).unwrap();
    }
    drop(tx);

    let mut output = Vec::new();
    timeout(
        Duration::from_secs(5),
        console::run(rx, &mut output, handle.clone()),
    )
    .await
    .unwrap()
    .unwrap();

    let output = String::from_utf8(output).unwrap();
    assert_eq!(output.matches("=== DV10 edge console ===").count(), 2);
    assert!(output.contains("Unknown command: x"));
    assert!(output.contains("Interval out of range"));
    assert!(output.contains("Fan mode 4 is not valid"));
    assert!(output.contains("Setting fan mode: Manual normal speed"));
    assert!(output.contains("=== Status ==="));

    let status = wait_status(&handle, |s| s.poll.cycles == 1).await;
    assert_eq!(status.control.rejected, 1);
    assert_eq!(status.control.writes_issued, 1);
    assert_eq!(mock.writes(), vec![(FAN_MODE_REGISTER, 2)]);
    // console-only and unparseable lines never reach the bridge
    assert_eq!(status.invalid_commands, 0);
}

#[tokio::test]
async fn console_stops_with_bridge() {
    let mock = MockTransceiver::new();
    let (bridge, handle) = build_bridge(&mock);
    let task = tokio::spawn(bridge.run());

    handle.cancel().await;
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send("r".to_string()).unwrap();

    let mut output = Vec::new();
    timeout(Duration::from_secs(2), console::run(rx, &mut output, handle))
        .await
        .unwrap()
        .unwrap();
    assert!(mock.reads().is_empty());
}
