use vent_modbus::RegisterCatalog;
use vent_types::{
    constants::{BDSEQ, NODE_CONTROL_REBIRTH},
    payload::{Metric, Payload},
    MetricValue,
};

use crate::MetricEnvelope;

fn payload(seq: Option<u8>, timestamp: Option<u64>, metrics: Vec<Metric>) -> Payload {
    Payload {
        timestamp,
        metrics,
        seq: seq.map(u64::from),
        uuid: None,
        body: None,
    }
}

fn bdseq_metric(bdseq: u8) -> Metric {
    let mut metric = Metric::new();
    let value = MetricValue::from(bdseq as i64);
    metric
        .set_name(BDSEQ.to_string())
        .set_datatype(value.datatype())
        .set_value(value.into());
    metric
}

pub(crate) fn node_birth_payload(seq: u8, bdseq: u8, timestamp: u64) -> Payload {
    let rebirth: Metric = MetricEnvelope::new(NODE_CONTROL_REBIRTH, timestamp, false).into();
    let mut bdseq = bdseq_metric(bdseq);
    bdseq.set_timestamp(timestamp);
    payload(Some(seq), Some(timestamp), vec![rebirth, bdseq])
}

/// Every catalog register with a zero value and its unit, in poll order.
pub(crate) fn device_birth_payload(seq: u8, catalog: &RegisterCatalog, timestamp: u64) -> Payload {
    let metrics = catalog
        .iter()
        .map(|register| MetricEnvelope::placeholder(register, timestamp).into())
        .collect();
    payload(Some(seq), Some(timestamp), metrics)
}

pub(crate) fn data_payload(seq: u8, envelopes: Vec<MetricEnvelope>, timestamp: u64) -> Payload {
    let metrics = envelopes.into_iter().map(Metric::from).collect();
    payload(Some(seq), Some(timestamp), metrics)
}

/// The death certificate carries only the bdSeq it pairs with.
pub(crate) fn node_death_payload(bdseq: u8) -> Payload {
    payload(None, None, vec![bdseq_metric(bdseq)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vent_types::{
        constants::ENG_UNIT,
        payload::{metric, DataType},
    };

    #[test]
    fn node_birth_carries_control_metrics() {
        let payload = node_birth_payload(0, 3, 100);
        assert_eq!(payload.seq, Some(0));
        assert_eq!(payload.timestamp, Some(100));
        assert_eq!(payload.metrics.len(), 2);

        let rebirth = &payload.metrics[0];
        assert_eq!(rebirth.name.as_deref(), Some(NODE_CONTROL_REBIRTH));
        assert_eq!(rebirth.datatype, Some(DataType::Boolean as u32));
        assert_eq!(rebirth.value, Some(metric::Value::BooleanValue(false)));

        let bdseq = &payload.metrics[1];
        assert_eq!(bdseq.name.as_deref(), Some(BDSEQ));
        assert_eq!(bdseq.datatype, Some(DataType::Int64 as u32));
        assert_eq!(bdseq.value, Some(metric::Value::LongValue(3)));
    }

    #[test]
    fn device_birth_declares_catalog() {
        let catalog = RegisterCatalog::dv10();
        let payload = device_birth_payload(1, &catalog, 100);
        assert_eq!(payload.seq, Some(1));
        assert_eq!(payload.metrics.len(), catalog.len());
        for (metric, register) in payload.metrics.iter().zip(catalog.iter()) {
            assert_eq!(metric.name.as_ref(), Some(&register.name));
            assert_eq!(metric.datatype, Some(register.datatype() as u32));
            assert_eq!(metric.string_property(ENG_UNIT), Some(register.unit.symbol()));
        }
    }

    #[test]
    fn death_has_no_sequence() {
        let payload = node_death_payload(7);
        assert_eq!(payload.seq, None);
        assert_eq!(payload.metrics, vec![bdseq_metric(7)]);
    }
}
