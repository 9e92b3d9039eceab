use std::time::Duration;

use tokio::time::Instant;
use vent_eon::Command;
use vent_modbus::{DeviceError, RegisterCatalog, FAN_MODE_REGISTER};
use vent_types::{
    constants::ENG_UNIT,
    payload::{metric, DataType, Payload},
    MetricValue,
};

mod utils;
use utils::tester::*;

fn metric_value<'a>(payload: &'a Payload, name: &str) -> Option<&'a metric::Value> {
    payload
        .metrics
        .iter()
        .find(|m| m.name.as_deref() == Some(name))
        .and_then(|m| m.value.as_ref())
}

#[tokio::test]
async fn data_carries_every_reading() {
    let mut t = start_bridge(|b| b);
    bring_online(&mut t.broker, 0).await;

    t.handle.send_command(Command::ReadNow).await.unwrap();
    let payload = expect_data(&mut t.broker).await;

    let catalog = RegisterCatalog::dv10();
    assert_eq!(payload.metrics.len(), catalog.len());
    for (metric, register) in payload.metrics.iter().zip(catalog.iter()) {
        assert_eq!(metric.name.as_ref(), Some(&register.name));
        assert_eq!(metric.datatype, Some(register.datatype() as u32));
        assert_ne!(metric.timestamp, None);
        assert_eq!(metric.properties, None);
    }

    match metric_value(&payload, "SupplyAirTemp") {
        Some(metric::Value::FloatValue(v)) => assert!((v - 25.0).abs() < 1e-3),
        other => panic!("unexpected SupplyAirTemp value {other:?}"),
    }
    assert_eq!(
        metric_value(&payload, "RunMode"),
        Some(&metric::Value::IntValue(RAW_VALUE as u32))
    );

    let status = t.handle.status();
    assert_eq!(status.last_success_count, 15);
    assert_eq!(status.last_total_count, 15);
    assert_eq!(status.session.data_published, 1);
}

#[tokio::test]
async fn data_metrics_carry_no_units() {
    let mut t = start_bridge(|b| b);
    bring_online(&mut t.broker, 0).await;

    t.handle.send_command(Command::ReadNow).await.unwrap();
    let payload = expect_data(&mut t.broker).await;
    assert!(payload
        .metrics
        .iter()
        .all(|m| m.string_property(ENG_UNIT).is_none()));
}

#[tokio::test]
async fn failed_reads_are_omitted() {
    let mut t = start_bridge(|b| b);
    t.mock.fail_register(6, DeviceError::Busy);
    t.mock.fail_register(2, DeviceError::Timeout);
    bring_online(&mut t.broker, 0).await;

    t.handle.send_command(Command::ReadNow).await.unwrap();
    let payload = expect_data(&mut t.broker).await;
    assert_eq!(payload.seq, Some(2));
    assert_eq!(payload.metrics.len(), 13);
    assert_eq!(metric_value(&payload, "SupplyAirTemp"), None);
    assert_eq!(metric_value(&payload, "RunMode"), None);

    let status = t.handle.status();
    assert_eq!(status.last_success_count, 13);
    assert_eq!(status.last_total_count, 15);
    assert_eq!(status.poll.reads_failed, 2);
}

#[tokio::test]
async fn empty_snapshot_is_not_published() {
    let mut t = start_bridge(|b| b);
    for register in RegisterCatalog::dv10().iter() {
        t.mock.fail_register(register.address, DeviceError::Timeout);
    }
    bring_online(&mut t.broker, 0).await;

    t.handle.send_command(Command::ReadNow).await.unwrap();
    let status = wait_status(&t.handle, |s| s.poll.cycles == 1).await;
    assert_eq!(status.last_success_count, 0);
    assert_eq!(status.session.data_published, 0);
    assert_eq!(status.session.not_ready, 0);
    assert_quiet(&mut t.broker);

    // the skipped cycle did not use a sequence number
    t.mock.clear_failure(6);
    t.handle.send_command(Command::ReadNow).await.unwrap();
    let payload = expect_data(&mut t.broker).await;
    assert_eq!(payload.seq, Some(2));
    assert_eq!(payload.metrics.len(), 1);
}

#[tokio::test]
async fn transport_failure_is_counted() {
    let mut t = start_bridge(|b| b);
    bring_online(&mut t.broker, 0).await;

    t.broker.reject_publishes(true);
    t.handle.send_command(Command::ReadNow).await.unwrap();
    let status = wait_status(&t.handle, |s| s.session.publish_failures == 1).await;
    assert_eq!(status.session.data_published, 0);

    t.broker.reject_publishes(false);
    t.handle.send_command(Command::ReadNow).await.unwrap();
    assert_eq!(expect_data(&mut t.broker).await.seq, Some(3));
}

#[tokio::test]
async fn fan_mode_command_writes_register() {
    let mut t = start_bridge(|b| b);
    bring_online(&mut t.broker, 0).await;

    t.broker
        .tx_event
        .send(fan_mode_command(MetricValue::Int32(2)))
        .unwrap();
    let status = wait_status(&t.handle, |s| s.control.writes_issued == 1).await;
    assert_eq!(status.control.writes_failed, 0);
    assert_eq!(t.mock.writes(), vec![(FAN_MODE_REGISTER, 2)]);

    t.broker
        .tx_event
        .send(fan_mode_command(MetricValue::Int32(9)))
        .unwrap();
    wait_status(&t.handle, |s| s.control.rejected == 1).await;
    assert_eq!(t.mock.writes().len(), 1);
}

#[tokio::test]
async fn oversized_fan_mode_is_not_truncated() {
    let mut t = start_bridge(|b| b);
    bring_online(&mut t.broker, 0).await;

    // 65539 would alias to code 3 if narrowed to 16 bits
    t.broker
        .tx_event
        .send(fan_mode_wire_command(
            DataType::UInt16,
            metric::Value::IntValue(65539),
        ))
        .unwrap();
    let status = wait_status(&t.handle, |s| s.invalid_commands == 1).await;
    assert_eq!(status.control.writes_issued, 0);

    t.broker
        .tx_event
        .send(fan_mode_wire_command(
            DataType::UInt32,
            metric::Value::IntValue(65539),
        ))
        .unwrap();
    wait_status(&t.handle, |s| s.invalid_commands == 2).await;
    assert!(t.mock.writes().is_empty());
}

#[tokio::test]
async fn console_actuator_codes() {
    let t = start_bridge(|b| b);

    t.handle.send_command(Command::SetActuator(4)).await.unwrap();
    wait_status(&t.handle, |s| s.control.rejected == 1).await;
    assert!(t.mock.writes().is_empty());

    t.handle.send_command(Command::SetActuator(3)).await.unwrap();
    wait_status(&t.handle, |s| s.control.writes_issued == 1).await;
    assert_eq!(t.mock.writes(), vec![(FAN_MODE_REGISTER, 3)]);

    t.mock.fail_writes(Some(DeviceError::SlaveDeviceFailure));
    t.handle.send_command(Command::SetActuator(1)).await.unwrap();
    wait_status(&t.handle, |s| s.control.writes_failed == 1).await;
}

#[tokio::test]
async fn interval_and_auto_read_commands() {
    let t = start_bridge(|b| b);

    t.handle.send_command(Command::ToggleAutoRead).await.unwrap();
    t.handle
        .send_command(Command::SetInterval(Duration::from_secs(30)))
        .await
        .unwrap();
    let status = wait_status(&t.handle, |s| s.poll_interval == Duration::from_secs(30)).await;
    assert!(status.auto_read);

    t.handle
        .send_command(Command::SetInterval(Duration::from_secs(1)))
        .await
        .unwrap();
    let status = wait_status(&t.handle, |s| s.invalid_commands == 1).await;
    assert_eq!(status.poll_interval, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn auto_read_publishes_on_interval() {
    let mut t = start_bridge(|b| {
        b.with_auto_read(true)
            .with_poll_interval(Duration::from_secs(5))
    });
    bring_online(&mut t.broker, 0).await;

    let first = expect_data_within(&mut t.broker, Duration::from_secs(30)).await;
    let first_at = Instant::now();
    assert_eq!(first.seq, Some(2));

    let second = expect_data_within(&mut t.broker, Duration::from_secs(30)).await;
    assert_eq!(second.seq, Some(3));
    assert!(first_at.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn reads_are_spaced_on_the_bus() {
    let mut t = start_bridge(|b| b.with_read_spacing(Duration::from_millis(50)));
    bring_online(&mut t.broker, 0).await;

    let start = Instant::now();
    t.handle.send_command(Command::ReadNow).await.unwrap();
    let payload = expect_data_within(&mut t.broker, Duration::from_secs(30)).await;
    assert_eq!(payload.metrics.len(), 15);
    assert!(start.elapsed() >= Duration::from_millis(700));
    assert_eq!(t.mock.reads().len(), 15);
}

